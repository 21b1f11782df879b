// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, assessment, auth, background, profile, session},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, optional_auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, assessments, sessions, profile, admin, background).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_layer = || middleware::from_fn_with_state(state.clone(), auth_middleware);
    // Sessions can be taken without an account
    let guest_layer = || middleware::from_fn_with_state(state.clone(), optional_auth_middleware);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        // Protected auth routes
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .layer(auth_layer()),
        );

    let assessment_routes = Router::new()
        .route("/", get(assessment::list_assessments))
        .route("/categories", get(assessment::list_categories))
        .route("/{id}", get(assessment::get_assessment))
        .merge(
            Router::new()
                .route("/{id}/sessions", post(session::start_session))
                .layer(guest_layer()),
        );

    let session_routes = Router::new()
        .route(
            "/{id}",
            get(session::get_session).delete(session::discard_session),
        )
        .route("/{id}/answer", put(session::select_answer))
        .route("/{id}/next", post(session::next_question))
        .route("/{id}/previous", post(session::previous_question))
        .route("/{id}/submit", post(session::submit_session))
        .route("/{id}/retake", post(session::retake_session))
        .layer(guest_layer());

    let profile_routes = Router::new()
        .route("/me", get(profile::get_me))
        .route("/history", get(profile::get_history))
        .route("/recommendations", get(profile::get_recommendations))
        .route("/interests", put(profile::update_interests))
        .route("/theme", get(profile::get_theme).put(profile::put_theme))
        .layer(auth_layer());

    let admin_routes = Router::new()
        .route("/stats", get(admin::get_stats))
        .route("/assessments", post(admin::create_assessment))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth_layer());

    let background_routes = Router::new()
        .route("/frame", post(background::next_frame))
        .route("/frames/{index}", get(background::get_frame));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/assessments", assessment_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/background", background_routes)
        .route("/api/themes", get(profile::list_themes))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

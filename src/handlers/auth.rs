// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    handlers::simulate_latency,
    models::user::{LoginRequest, SignupRequest, StoredUser, UserResponse},
    store::Repository,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// `user-<millis>-<5 random chars>`
fn new_user_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("user-{}-{}", Utc::now().timestamp_millis(), &suffix[..5])
}

/// Registers a new user.
///
/// The admin email is reserved and emails are unique; the uniqueness check
/// and the insert are one store update. The password is stored
/// as an Argon2 hash. Returns 201 Created and the user (without the hash).
pub async fn signup(
    State(repo): State<Repository>,
    State(config): State<Config>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.email == config.admin_email {
        return Err(AppError::Conflict(
            "This email address is reserved for administration.".to_string(),
        ));
    }

    simulate_latency(&config).await;

    let user = StoredUser {
        id: new_user_id(),
        name: payload.name,
        email: payload.email,
        interests: None,
        password_hash: Some(hash_password(&payload.password)?),
    };

    let added = repo.add_user(&user).await.map_err(|e| {
        tracing::error!("Failed to register user: {:?}", e);
        AppError::from(e)
    })?;
    if !added {
        return Err(AppError::Conflict(
            "An account with this email already exists.".to_string(),
        ));
    }

    tracing::info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Authenticates the admin sentinel or a stored user and returns a JWT.
///
/// The admin is matched by configured email and password (plaintext). Users
/// are matched by email and stored hash; a record without a hash never logs in.
pub async fn login(
    State(repo): State<Repository>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    simulate_latency(&config).await;

    let (subject, name) =
        if payload.email == config.admin_email && payload.password == config.admin_password {
            (config.admin_id.clone(), "Site Administrator".to_string())
        } else {
            let user = repo
                .find_user_by_email(&payload.email)
                .await?
                .ok_or(AppError::AuthError(INVALID_CREDENTIALS.to_string()))?;

            let verified = user
                .password_hash
                .as_deref()
                .is_some_and(|hash| verify_password(&payload.password, hash));
            if !verified {
                return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
            }
            (user.id, user.name)
        };

    let role = repo
        .role_of(&subject, &config.admin_id)
        .await?
        .ok_or(AppError::AuthError(INVALID_CREDENTIALS.to_string()))?;

    let token = sign_jwt(&subject, &role, &config.jwt_secret, config.jwt_expiration)?;

    if let Err(e) = repo.set_current_user_id(&subject).await {
        tracing::warn!("Could not record current user {}: {}", subject, e);
    }

    tracing::info!("Login successful for {} ({})", subject, role.as_str());
    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "userId": subject,
        "name": name,
        "role": role.as_str(),
    })))
}

/// Forgets the recorded current user. The token itself is discarded client-side.
pub async fn logout(
    State(repo): State<Repository>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    if repo.current_user_id().await?.as_deref() == Some(claims.sub.as_str()) {
        repo.clear_current_user_id().await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

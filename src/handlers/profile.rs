// src/handlers/profile.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        assessment::{Assessment, AssessmentSummary},
        theme::{THEME_NAMES, ThemeMode, ThemePreference, is_known_theme},
        user::{Role, UpdateInterestsRequest, UserProfile},
    },
    recommend::recommend_for,
    state::AppState,
    store::Repository,
    utils::jwt::Claims,
};

const ADMIN_NAME: &str = "Site Administrator";
const ADMIN_INTERESTS: [&str; 4] = [
    "Site Management",
    "Assessment Quality",
    "AI/ML",
    "Web Development",
];

/// Number of catalog entries suggested to a caller with nothing to go on.
const STARTER_COUNT: usize = 2;

/// Builds the profile for a resolved role.
///
/// The admin has no stored record and gets a synthetic profile. A user id
/// that no longer resolves is reported as not found.
pub async fn get_user_data(
    repo: &Repository,
    config: &Config,
    role: &Role,
) -> Result<UserProfile, AppError> {
    match role {
        Role::Admin => Ok(UserProfile {
            id: config.admin_id.clone(),
            name: ADMIN_NAME.to_string(),
            email: config.admin_email.clone(),
            role: role.as_str(),
            assessment_history: repo.results_for_user(&config.admin_id).await?,
            interests: ADMIN_INTERESTS.iter().map(|s| s.to_string()).collect(),
        }),
        Role::User(id) => {
            let user = repo
                .find_user(id)
                .await?
                .ok_or(AppError::NotFound("User not found".to_string()))?;
            let history = repo.results_for_user(&user.id).await?;

            Ok(UserProfile {
                id: user.id,
                name: user.name,
                email: user.email,
                role: role.as_str(),
                assessment_history: history,
                interests: user.interests.unwrap_or_default(),
            })
        }
    }
}

pub async fn get_me(
    State(repo): State<Repository>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let profile = get_user_data(&repo, &config, &claims.role()).await?;
    Ok(Json(profile))
}

/// The caller's results, oldest first.
pub async fn get_history(
    State(repo): State<Repository>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let history = repo.results_for_user(&claims.sub).await?;
    Ok(Json(history))
}

pub async fn update_interests(
    State(repo): State<Repository>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateInterestsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let Role::User(id) = claims.role() else {
        return Err(AppError::Forbidden(
            "Administrator interests are fixed.".to_string(),
        ));
    };

    let interests: Vec<String> = payload
        .interests
        .into_iter()
        .map(|i| i.trim().to_string())
        .collect();

    if !repo.update_interests(&id, interests.clone()).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!("Updated interests for {}", id);
    Ok(Json(json!({ "interests": interests })))
}

/// Which of the three recommendation views the caller gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// No history and no interests: the first catalog entries.
    Starters,
    Personalized,
    /// Nothing resolved; the client links to the full catalog.
    BrowseAll,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub kind: RecommendationKind,
    pub assessments: Vec<AssessmentSummary>,
}

/// Recommended assessments for the caller.
///
/// A caller with neither history nor interests gets starters and the gateway
/// is not asked. Otherwise a gateway failure or an answer that resolves to
/// nothing gives `browse_all`.
pub async fn get_recommendations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let profile = get_user_data(&state.repo, &state.config, &claims.role()).await?;

    if profile.assessment_history.is_empty() && profile.interests.is_empty() {
        let starters: Vec<_> = state.catalog.all().iter().take(STARTER_COUNT).cloned().collect();
        return Ok(Json(RecommendationsResponse {
            kind: RecommendationKind::Starters,
            assessments: summaries(&starters),
        }));
    }

    let recommended = match recommend_for(
        state.gateway.as_ref(),
        &profile.assessment_history,
        &profile.interests,
        &state.catalog,
    )
    .await
    {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!("Recommendations unavailable for {}: {}", profile.id, e);
            Vec::new()
        }
    };

    let kind = if recommended.is_empty() {
        RecommendationKind::BrowseAll
    } else {
        RecommendationKind::Personalized
    };

    Ok(Json(RecommendationsResponse {
        kind,
        assessments: summaries(&recommended),
    }))
}

fn summaries(list: &[Arc<Assessment>]) -> Vec<AssessmentSummary> {
    list.iter().map(|a| AssessmentSummary::from(a.as_ref())).collect()
}

pub async fn list_themes() -> impl IntoResponse {
    Json(THEME_NAMES)
}

pub async fn get_theme(
    State(repo): State<Repository>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(repo.theme_preference(&claims.sub).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateThemeRequest {
    pub theme: Option<String>,
    pub mode: Option<ThemeMode>,
}

/// Updates either part of the preference; omitted fields keep their value.
pub async fn put_theme(
    State(repo): State<Repository>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateThemeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let current = repo.theme_preference(&claims.sub).await?;

    let theme = match payload.theme {
        Some(name) if !is_known_theme(&name) => {
            return Err(AppError::BadRequest(format!("Unknown theme '{}'", name)));
        }
        Some(name) => name,
        None => current.theme,
    };

    let preference = ThemePreference {
        theme,
        mode: payload.mode.unwrap_or(current.mode),
    };
    repo.set_theme_preference(&claims.sub, &preference).await?;

    Ok(Json(preference))
}

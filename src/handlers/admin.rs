// src/handlers/admin.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    catalog::Catalog,
    config::Config,
    error::AppError,
    handlers::simulate_latency,
    models::assessment::{
        Assessment, AssessmentCategory, CreateAssessmentRequest, Question,
    },
    store::Repository,
    utils::html::clean_text,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: AssessmentCategory,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStats {
    /// Stored users plus the administrator.
    pub total_users: usize,
    pub total_assessments: usize,
    pub assessments_by_category: Vec<CategoryCount>,
}

/// Site-wide counters.
/// Admin only.
pub async fn get_stats(
    State(repo): State<Repository>,
    State(catalog): State<Arc<Catalog>>,
) -> Result<impl IntoResponse, AppError> {
    let users = repo.users().await?;

    let stats = SiteStats {
        total_users: users.len() + 1,
        total_assessments: catalog.len(),
        assessments_by_category: catalog
            .category_counts()
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect(),
    };

    Ok(Json(stats))
}

/// Validates and sanitizes an authored assessment.
/// Admin only.
///
/// The assessment is echoed back but not added to the catalog.
pub async fn create_assessment(
    State(config): State<Config>,
    Json(payload): Json<CreateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    for (i, question) in payload.questions.iter().enumerate() {
        question
            .check_consistency()
            .map_err(|msg| AppError::BadRequest(format!("Question {}: {}", i + 1, msg)))?;
    }

    let stamp = Utc::now().timestamp_millis();
    let questions = payload
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| Question {
            id: format!("q-{}-{}", stamp, i + 1),
            question_text: clean_text(&q.question_text),
            options: q.options.iter().map(|o| clean_text(o)).collect(),
            correct_answer: clean_text(&q.correct_answer),
            kind: q.kind,
        })
        .collect();

    let assessment = Assessment {
        id: format!("custom-{}", Uuid::new_v4().simple()),
        title: clean_text(&payload.title),
        category: payload.category,
        description: clean_text(&payload.description),
        questions,
        duration_minutes: payload.duration_minutes,
        created_at: Utc::now(),
        upvotes: 0,
        downvotes: 0,
        is_predefined: false,
    };

    simulate_latency(&config).await;

    tracing::info!(
        "Admin authored '{}' with {} questions (not persisted)",
        assessment.title,
        assessment.questions.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Assessment created successfully!",
            "assessment": assessment,
            "persisted": false,
        })),
    ))
}

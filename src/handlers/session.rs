// src/handlers/session.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    catalog::Catalog,
    config::Config,
    error::AppError,
    handlers::simulate_latency,
    models::{
        result::SubmitResponse,
        session::{AnswerRequest, SessionView},
    },
    session::{AssessmentSession, SessionRegistry},
    store::Repository,
    utils::jwt::Claims,
};

/// Opens a new attempt at an assessment for the caller.
pub async fn start_session(
    State(catalog): State<Arc<Catalog>>,
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = catalog
        .by_id(&assessment_id)
        .ok_or(AppError::NotFound("Assessment not found".to_string()))?;

    let session = AssessmentSession::new(assessment, claims.sub.clone())?;
    let id = sessions.open(session.clone())?;

    tracing::info!("User {} started '{}' (session {})", claims.sub, assessment_id, id);
    Ok((StatusCode::CREATED, Json(SessionView::new(id, &session))))
}

pub async fn get_session(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.with_session(id, &claims.sub, |s| Ok(SessionView::new(id, s)))?;
    Ok(Json(view))
}

/// Records the answer for the current question.
pub async fn select_answer(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.with_session(id, &claims.sub, |s| {
        s.select_answer(payload.option)?;
        Ok(SessionView::new(id, s))
    })?;
    Ok(Json(view))
}

/// Moves to the next question. Fails with 400 while the current one is unanswered;
/// on the last question the session is returned unchanged.
pub async fn next_question(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.with_session(id, &claims.sub, |s| {
        s.next()?;
        Ok(SessionView::new(id, s))
    })?;
    Ok(Json(view))
}

pub async fn previous_question(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.with_session(id, &claims.sub, |s| {
        s.previous()?;
        Ok(SessionView::new(id, s))
    })?;
    Ok(Json(view))
}

/// Scores the attempt and appends the result to the history.
///
/// A failed write is logged and reported through `persisted: false`; the
/// score is returned either way.
pub async fn submit_session(
    State(sessions): State<Arc<SessionRegistry>>,
    State(repo): State<Repository>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (result, review, correct_count, total_questions) =
        sessions.with_session(id, &claims.sub, |s| {
            let result = s.submit()?.clone();
            Ok((result, s.review(), s.correct_count(), s.question_count()))
        })?;

    simulate_latency(&config).await;

    let persisted = match repo.append_result(&result).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                "Failed to save result of '{}' for {}: {}",
                result.assessment_id,
                result.user_id,
                e
            );
            false
        }
    };

    tracing::info!(
        "User {} scored {}% on '{}'",
        result.user_id,
        result.score_percentage,
        result.assessment_id
    );

    let message = format!("You scored {}%.", result.score_percentage);
    Ok(Json(SubmitResponse {
        result,
        correct_count,
        total_questions,
        review,
        persisted,
        message,
    }))
}

/// Resets a completed session to its first question.
pub async fn retake_session(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions.with_session(id, &claims.sub, |s| {
        s.retake()?;
        Ok(SessionView::new(id, s))
    })?;
    Ok(Json(view))
}

/// Drops the session, completed or not.
pub async fn discard_session(
    State(sessions): State<Arc<SessionRegistry>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    sessions.discard(id, &claims.sub)?;
    Ok(StatusCode::NO_CONTENT)
}

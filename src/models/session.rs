// src/models/session.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    models::{assessment::PublicQuestion, result::AssessmentResult},
    session::{AssessmentSession, SessionState},
};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

/// Snapshot of a session as the client sees it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub assessment_id: String,
    pub assessment_title: String,
    pub status: SessionStatus,
    pub total_questions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<PublicQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_answer: Option<String>,
    pub is_last_question: bool,
    pub progress_percentage: f64,
    pub answers: Vec<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AssessmentResult>,
}

impl SessionView {
    pub fn new(session_id: Uuid, session: &AssessmentSession) -> Self {
        let assessment = session.assessment();
        let total = session.question_count();

        let (status, current_index, result) = match session.state() {
            SessionState::InProgress { index } => (SessionStatus::InProgress, Some(*index), None),
            SessionState::Completed(result) => {
                (SessionStatus::Completed, None, Some(result.clone()))
            }
        };

        let progress_percentage = match current_index {
            Some(index) => (index + 1) as f64 / total as f64 * 100.0,
            None => 100.0,
        };

        Self {
            session_id,
            assessment_id: assessment.id.clone(),
            assessment_title: assessment.title.clone(),
            status,
            total_questions: total,
            current_index,
            current_question: current_index.map(|i| PublicQuestion::from(&assessment.questions[i])),
            selected_answer: current_index.and_then(|i| session.answers()[i].clone()),
            is_last_question: session.is_last_question(),
            progress_percentage,
            answers: session.answers().to_vec(),
            result,
        }
    }
}

/// Body of `PUT /api/sessions/{id}/answer`.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub option: String,
}

// src/models/result.rs

use serde::{Deserialize, Serialize};

use crate::models::assessment::AssessmentCategory;

/// One answered question inside a stored result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: String,
    pub selected_answer: String,
}

/// Persisted outcome of a completed session.
/// Title and category are denormalized at write time. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub assessment_id: String,
    pub assessment_title: String,
    pub category: AssessmentCategory,
    pub user_id: String,
    pub score_percentage: u8,
    pub answers: Vec<AnswerRecord>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Per-question breakdown shown on the results screen.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReview {
    pub question_id: String,
    pub question_text: String,
    pub selected_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
}

/// DTO returned when a session is submitted.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub result: AssessmentResult,
    pub correct_count: usize,
    pub total_questions: usize,
    pub review: Vec<QuestionReview>,
    /// False when the store rejected the write; the result is still valid.
    pub persisted: bool,
    pub message: String,
}

// src/models/assessment.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Fixed set of assessment categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssessmentCategory {
    #[serde(rename = "AI/ML")]
    AiMl,
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Data Structures")]
    DataStructures,
    #[serde(rename = "Cybersecurity")]
    Cybersecurity,
    #[serde(rename = "Cloud Computing")]
    CloudComputing,
}

impl AssessmentCategory {
    /// All categories, in display order.
    pub const ALL: [AssessmentCategory; 5] = [
        AssessmentCategory::AiMl,
        AssessmentCategory::WebDevelopment,
        AssessmentCategory::DataStructures,
        AssessmentCategory::Cybersecurity,
        AssessmentCategory::CloudComputing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentCategory::AiMl => "AI/ML",
            AssessmentCategory::WebDevelopment => "Web Development",
            AssessmentCategory::DataStructures => "Data Structures",
            AssessmentCategory::Cybersecurity => "Cybersecurity",
            AssessmentCategory::CloudComputing => "Cloud Computing",
        }
    }
}

impl fmt::Display for AssessmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
}

/// Options every true/false question must carry, in this order.
pub const TRUE_FALSE_OPTIONS: [&str; 2] = ["True", "False"];

/// A single question inside an assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique within the owning assessment.
    pub id: String,

    pub question_text: String,

    /// Between 2 and 5 options, shown in this order.
    pub options: Vec<String>,

    /// Must be one of `options`.
    pub correct_answer: String,

    #[serde(rename = "type")]
    pub kind: QuestionKind,
}

/// An immutable, categorized quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub title: String,
    pub category: AssessmentCategory,
    pub description: String,
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub downvotes: u32,
    #[serde(default)]
    pub is_predefined: bool,
}

/// DTO for sending a question to the client (excludes the correct answer).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    pub question_text: String,
    pub options: Vec<String>,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            question_text: q.question_text.clone(),
            options: q.options.clone(),
            kind: q.kind,
        }
    }
}

/// Catalog listing entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSummary {
    pub id: String,
    pub title: String,
    pub category: AssessmentCategory,
    pub description: String,
    pub question_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub upvotes: u32,
    pub downvotes: u32,
    pub is_predefined: bool,
}

impl From<&Assessment> for AssessmentSummary {
    fn from(a: &Assessment) -> Self {
        Self {
            id: a.id.clone(),
            title: a.title.clone(),
            category: a.category,
            description: a.description.clone(),
            question_count: a.questions.len(),
            duration_minutes: a.duration_minutes,
            created_at: a.created_at,
            upvotes: a.upvotes,
            downvotes: a.downvotes,
            is_predefined: a.is_predefined,
        }
    }
}

/// Full assessment as shown before starting it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentDetail {
    #[serde(flatten)]
    pub summary: AssessmentSummary,
    pub questions: Vec<PublicQuestion>,
}

impl From<&Assessment> for AssessmentDetail {
    fn from(a: &Assessment) -> Self {
        Self {
            summary: AssessmentSummary::from(a),
            questions: a.questions.iter().map(PublicQuestion::from).collect(),
        }
    }
}

/// Query parameters for the catalog listing.
#[derive(Debug, Deserialize)]
pub struct CatalogParams {
    pub category: Option<AssessmentCategory>,
}

/// DTO for the admin authoring form. Validated, never persisted.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssessmentRequest {
    #[validate(length(min = 5, max = 200, message = "Title must be at least 5 characters."))]
    pub title: String,
    pub category: AssessmentCategory,
    #[validate(length(
        min = 20,
        max = 2000,
        message = "Description must be at least 20 characters."
    ))]
    pub description: String,
    #[validate(range(min = 1, message = "Duration must be a positive number of minutes."))]
    pub duration_minutes: Option<u32>,
    #[validate(length(min = 1, message = "At least one question is required."), nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[validate(length(
        min = 10,
        max = 1000,
        message = "Question text must be at least 10 characters."
    ))]
    pub question_text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, message = "Correct answer must be selected."))]
    pub correct_answer: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
}

impl CreateQuestionRequest {
    /// Cross-field rules the derive cannot express.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.kind == QuestionKind::TrueFalse && self.options != TRUE_FALSE_OPTIONS {
            return Err("True/false questions must have the options True and False.".to_string());
        }
        if !self.options.contains(&self.correct_answer) {
            return Err(format!(
                "Correct answer '{}' is not one of the options.",
                self.correct_answer
            ));
        }
        Ok(())
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("must_have_at_least_two_options"));
    }
    if options.len() > 5 {
        return Err(validator::ValidationError::new("cannot_have_more_than_five_options"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

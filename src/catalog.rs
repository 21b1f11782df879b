// src/catalog.rs

use std::{collections::HashSet, sync::Arc};

use thiserror::Error;

use crate::models::assessment::{
    Assessment, AssessmentCategory, QuestionKind, TRUE_FALSE_OPTIONS,
};

/// Predefined assessments shipped with the binary.
const PREDEFINED_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("assessment '{0}' appears more than once")]
    DuplicateAssessment(String),

    #[error("assessment '{0}' has no questions")]
    EmptyAssessment(String),

    #[error("assessment '{assessment}': {reason}")]
    InvalidQuestion { assessment: String, reason: String },
}

/// Static, immutable list of assessments. Insertion order is preserved.
#[derive(Debug, Clone)]
pub struct Catalog {
    assessments: Vec<Arc<Assessment>>,
}

impl Catalog {
    /// Loads the predefined assessments embedded at compile time.
    pub fn predefined() -> Result<Self, CatalogError> {
        Self::from_json(PREDEFINED_CATALOG)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let assessments: Vec<Assessment> = serde_json::from_str(raw)?;
        Self::new(assessments)
    }

    /// Builds a catalog after checking every assessment's invariants.
    pub fn new(assessments: Vec<Assessment>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for a in &assessments {
            if !seen.insert(a.id.as_str()) {
                return Err(CatalogError::DuplicateAssessment(a.id.clone()));
            }
            validate_assessment(a)?;
        }

        Ok(Self {
            assessments: assessments.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn all(&self) -> &[Arc<Assessment>] {
        &self.assessments
    }

    pub fn len(&self) -> usize {
        self.assessments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assessments.is_empty()
    }

    pub fn by_id(&self, id: &str) -> Option<Arc<Assessment>> {
        self.assessments.iter().find(|a| a.id == id).cloned()
    }

    pub fn by_category(&self, category: AssessmentCategory) -> Vec<Arc<Assessment>> {
        self.assessments
            .iter()
            .filter(|a| a.category == category)
            .cloned()
            .collect()
    }

    /// Case-insensitive title lookup.
    pub fn by_title(&self, title: &str) -> Option<Arc<Assessment>> {
        let wanted = title.trim().to_lowercase();
        self.assessments
            .iter()
            .find(|a| a.title.to_lowercase() == wanted)
            .cloned()
    }

    /// Number of assessments per category, in first-seen catalog order.
    pub fn category_counts(&self) -> Vec<(AssessmentCategory, usize)> {
        let mut counts: Vec<(AssessmentCategory, usize)> = Vec::new();
        for a in &self.assessments {
            match counts.iter_mut().find(|(c, _)| *c == a.category) {
                Some((_, n)) => *n += 1,
                None => counts.push((a.category, 1)),
            }
        }
        counts
    }
}

fn validate_assessment(a: &Assessment) -> Result<(), CatalogError> {
    if a.questions.is_empty() {
        return Err(CatalogError::EmptyAssessment(a.id.clone()));
    }

    let invalid = |reason: String| CatalogError::InvalidQuestion {
        assessment: a.id.clone(),
        reason,
    };

    let mut question_ids = HashSet::new();
    for q in &a.questions {
        if !question_ids.insert(q.id.as_str()) {
            return Err(invalid(format!("duplicate question id '{}'", q.id)));
        }
        if !(2..=5).contains(&q.options.len()) {
            return Err(invalid(format!(
                "question '{}' has {} options",
                q.id,
                q.options.len()
            )));
        }
        if !q.options.contains(&q.correct_answer) {
            return Err(invalid(format!(
                "question '{}' has a correct answer outside its options",
                q.id
            )));
        }
        if q.kind == QuestionKind::TrueFalse && q.options != TRUE_FALSE_OPTIONS {
            return Err(invalid(format!(
                "true/false question '{}' must offer exactly True and False",
                q.id
            )));
        }
    }
    Ok(())
}

// src/recommend.rs

//! Assessment recommendations from an external service.
//!
//! The service sees the user's history (category, score, interests) and the
//! catalog (category, title) and answers with a list of titles. Titles are
//! resolved back to catalog entries case-insensitively; anything that does
//! not resolve is dropped.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{
    catalog::Catalog,
    models::{assessment::Assessment, result::AssessmentResult},
};

/// Interest string used when the user has declared none.
pub const DEFAULT_INTEREST: &str = "General Computer Science";

/// Category label for the synthetic entry sent when there is no history yet.
pub const NO_HISTORY_CATEGORY: &str = "General";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("recommendation service is not configured")]
    NotConfigured,

    #[error("recommendation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("recommendation service returned status {0}")]
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHistoryEntry {
    pub assessment_category: String,
    pub score: u8,
    pub interests: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableAssessmentInfo {
    pub assessment_category: String,
    pub assessment_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub user_history: Vec<UserHistoryEntry>,
    pub available_assessments: Vec<AvailableAssessmentInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<String>,
}

#[async_trait]
pub trait RecommendationGateway: Send + Sync {
    /// Returns recommended assessment titles.
    async fn recommend(&self, request: &RecommendationRequest) -> Result<Vec<String>, GatewayError>;
}

/// Gateway used when no service URL is configured.
#[derive(Debug, Default)]
pub struct DisabledGateway;

#[async_trait]
impl RecommendationGateway for DisabledGateway {
    async fn recommend(&self, _request: &RecommendationRequest) -> Result<Vec<String>, GatewayError> {
        Err(GatewayError::NotConfigured)
    }
}

/// POSTs the request as JSON and expects `{"recommendations": [...]}` back.
#[derive(Debug, Clone)]
pub struct HttpRecommendationGateway {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpRecommendationGateway {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl RecommendationGateway for HttpRecommendationGateway {
    async fn recommend(&self, request: &RecommendationRequest) -> Result<Vec<String>, GatewayError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body: RecommendationResponse = response.json().await?;
        Ok(body.recommendations)
    }
}

/// Builds the gateway input from a user's results and declared interests.
pub fn build_request(
    history: &[AssessmentResult],
    interests: &[String],
    catalog: &Catalog,
) -> RecommendationRequest {
    let interests = if interests.is_empty() {
        DEFAULT_INTEREST.to_string()
    } else {
        interests.join(", ")
    };

    let mut user_history: Vec<UserHistoryEntry> = history
        .iter()
        .map(|r| UserHistoryEntry {
            assessment_category: r.category.to_string(),
            score: r.score_percentage,
            interests: interests.clone(),
        })
        .collect();

    if user_history.is_empty() {
        user_history.push(UserHistoryEntry {
            assessment_category: NO_HISTORY_CATEGORY.to_string(),
            score: 0,
            interests,
        });
    }

    let available_assessments = catalog
        .all()
        .iter()
        .map(|a| AvailableAssessmentInfo {
            assessment_category: a.category.to_string(),
            assessment_title: a.title.clone(),
        })
        .collect();

    RecommendationRequest {
        user_history,
        available_assessments,
    }
}

/// Maps titles to catalog entries, dropping unknown titles and repeats.
pub fn resolve_titles(titles: &[String], catalog: &Catalog) -> Vec<Arc<Assessment>> {
    let mut resolved: Vec<Arc<Assessment>> = Vec::new();
    for title in titles {
        match catalog.by_title(title) {
            Some(a) if !resolved.iter().any(|r| r.id == a.id) => resolved.push(a),
            Some(_) => {}
            None => tracing::debug!("Dropping unresolved recommendation '{}'", title),
        }
    }
    resolved
}

/// Asks the gateway and resolves its answer against the catalog.
pub async fn recommend_for(
    gateway: &dyn RecommendationGateway,
    history: &[AssessmentResult],
    interests: &[String],
    catalog: &Catalog,
) -> Result<Vec<Arc<Assessment>>, GatewayError> {
    let request = build_request(history, interests, catalog);
    let titles = gateway.recommend(&request).await?;
    Ok(resolve_titles(&titles, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{assessment::AssessmentCategory, result::AnswerRecord};

    struct FixedGateway(Vec<String>);

    #[async_trait]
    impl RecommendationGateway for FixedGateway {
        async fn recommend(&self, _: &RecommendationRequest) -> Result<Vec<String>, GatewayError> {
            Ok(self.0.clone())
        }
    }

    fn catalog() -> Catalog {
        Catalog::predefined().unwrap()
    }

    fn result(category: AssessmentCategory, score: u8) -> AssessmentResult {
        AssessmentResult {
            assessment_id: "x".to_string(),
            assessment_title: "X".to_string(),
            category,
            user_id: "u1".to_string(),
            score_percentage: score,
            answers: vec![AnswerRecord {
                question_id: "q".to_string(),
                selected_answer: "True".to_string(),
            }],
            completed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn request_maps_history_and_joins_interests() {
        let history = vec![
            result(AssessmentCategory::AiMl, 80),
            result(AssessmentCategory::Cybersecurity, 40),
        ];
        let interests = vec!["Rust".to_string(), "Security".to_string()];
        let req = build_request(&history, &interests, &catalog());

        assert_eq!(req.user_history.len(), 2);
        assert_eq!(req.user_history[0].assessment_category, "AI/ML");
        assert_eq!(req.user_history[1].score, 40);
        assert_eq!(req.user_history[1].interests, "Rust, Security");
        assert_eq!(req.available_assessments.len(), 7);
        assert_eq!(
            req.available_assessments[1].assessment_title,
            "Web Development Fundamentals"
        );
    }

    #[test]
    fn request_without_history_or_interests_uses_default() {
        let req = build_request(&[], &[], &catalog());
        assert_eq!(
            req.user_history,
            vec![UserHistoryEntry {
                assessment_category: NO_HISTORY_CATEGORY.to_string(),
                score: 0,
                interests: DEFAULT_INTEREST.to_string(),
            }]
        );
    }

    #[test]
    fn history_without_interests_uses_default_interest() {
        let req = build_request(&[result(AssessmentCategory::AiMl, 50)], &[], &catalog());
        assert_eq!(req.user_history[0].interests, DEFAULT_INTEREST);
    }

    #[test]
    fn request_serializes_with_camel_case_fields() {
        let req = build_request(&[], &["Cloud".to_string()], &catalog());
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["userHistory"][0]["assessmentCategory"], "General");
        assert_eq!(json["userHistory"][0]["interests"], "Cloud");
        assert!(json["availableAssessments"][0]["assessmentTitle"].is_string());
    }

    #[test]
    fn resolves_exact_title_and_drops_unknown() {
        let titles = vec![
            "Web Development Fundamentals".to_string(),
            "Nonexistent Quiz".to_string(),
        ];
        let resolved = resolve_titles(&titles, &catalog());
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "web-dev-fundamentals");
    }

    #[test]
    fn resolution_is_case_insensitive_and_deduplicated() {
        let titles = vec![
            "cybersecurity essentials".to_string(),
            "CYBERSECURITY ESSENTIALS".to_string(),
            "Cloud Computing Fundamentals".to_string(),
        ];
        let ids: Vec<_> = resolve_titles(&titles, &catalog())
            .iter()
            .map(|a| a.id.clone())
            .collect();
        assert_eq!(ids, vec!["cybersecurity-essentials", "cloud-computing-fundamentals"]);
    }

    #[tokio::test]
    async fn recommend_for_resolves_gateway_output() {
        let gateway = FixedGateway(vec!["Python for Data Science".to_string()]);
        let out = recommend_for(&gateway, &[], &[], &catalog()).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "python-for-data-science");
    }

    #[tokio::test]
    async fn disabled_gateway_reports_not_configured() {
        let err = recommend_for(&DisabledGateway, &[], &[], &catalog())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured));
    }
}

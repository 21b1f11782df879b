// src/handlers/assessment.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{
    catalog::Catalog,
    error::AppError,
    models::assessment::{AssessmentCategory, AssessmentDetail, AssessmentSummary, CatalogParams},
};

/// Lists the catalog, optionally narrowed to one category.
pub async fn list_assessments(
    State(catalog): State<Arc<Catalog>>,
    Query(params): Query<CatalogParams>,
) -> Result<impl IntoResponse, AppError> {
    let assessments = match params.category {
        Some(category) => catalog.by_category(category),
        None => catalog.all().to_vec(),
    };

    let list: Vec<AssessmentSummary> = assessments
        .iter()
        .map(|a| AssessmentSummary::from(a.as_ref()))
        .collect();
    Ok(Json(list))
}

pub async fn list_categories() -> impl IntoResponse {
    Json(AssessmentCategory::ALL)
}

/// Returns one assessment with its questions (correct answers hidden).
pub async fn get_assessment(
    State(catalog): State<Arc<Catalog>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = catalog
        .by_id(&id)
        .ok_or(AppError::NotFound("Assessment not found".to_string()))?;

    Ok(Json(AssessmentDetail::from(assessment.as_ref())))
}

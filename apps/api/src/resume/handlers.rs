//! Axum route handlers for the Resume API.

use axum::{
    extract::State,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::models::resume::{Resume, ResumeListing};
use crate::resume::patch::apply_patch;
use crate::resume::path::Segment;
use crate::resume::service;
use crate::routes::{DataResponse, SuccessResponse, NO_STORE_HEADERS};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PatchRequest {
    pub path: Option<Vec<Segment>>,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub struct CreateWithTitleRequest {
    pub title: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/resume/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DataResponse<Resume>>, AppError> {
    let resume = service::get_resume(state.store.as_ref(), id).await?;
    Ok(Json(DataResponse::new(resume)))
}

/// PATCH /api/resume/:id
///
/// Sets `value` at `path`; an empty path merges a partial document.
pub async fn handle_patch_resume(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<PatchRequest>,
) -> Result<Json<DataResponse<Resume>>, AppError> {
    let segments: Vec<String> = request
        .path
        .ok_or_else(|| AppError::Validation("Invalid path".to_string()))?
        .into_iter()
        .map(Segment::into_string)
        .collect();

    let resume = apply_patch(state.store.as_ref(), id, &segments, &request.value).await?;
    Ok(Json(DataResponse::new(resume)))
}

/// DELETE /api/resume/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    service::delete_resume(state.store.as_ref(), id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/resumes
///
/// The owner's resumes with contact details, newest first. Never cached.
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let resumes: Vec<ResumeListing> = state.store.list_resumes(state.owner_id).await?;
    Ok((NO_STORE_HEADERS, Json(DataResponse::new(resumes))))
}

/// POST /api/resume/:id/duplicate
pub async fn handle_duplicate_resume(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let copy = service::duplicate_resume(state.store.as_ref(), state.owner_id, id).await?;
    Ok((NO_STORE_HEADERS, Json(DataResponse::new(copy))))
}

/// POST /api/resume/create
///
/// Duplicates the most recently updated resume, or seeds a starter one.
pub async fn handle_create_resume(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Resume>>, AppError> {
    let resume = service::create_resume(state.store.as_ref(), state.owner_id).await?;
    Ok(Json(DataResponse::new(resume)))
}

/// POST /api/resume/create-with-title
pub async fn handle_create_with_title(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateWithTitleRequest>,
) -> Result<Json<DataResponse<Resume>>, AppError> {
    let title = request.title.unwrap_or_default();
    let resume =
        service::create_resume_with_title(state.store.as_ref(), state.owner_id, &title).await?;
    Ok(Json(DataResponse::new(resume)))
}

//! Axum route handlers for job applications.

use axum::{
    extract::State,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::models::job_application::{JobApplication, JobApplicationPatch, NewJobApplication};
use crate::routes::{DataResponse, SuccessResponse};
use crate::state::AppState;

fn not_found() -> AppError {
    AppError::NotFound("Job application not found".to_string())
}

/// GET /api/job-applications
///
/// Most recently updated first, each with the title of the resume it points at.
pub async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<JobApplication>>>, AppError> {
    let applications = state.store.list_job_applications().await?;
    Ok(Json(DataResponse::new(applications)))
}

/// POST /api/job-applications
pub async fn handle_create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewJobApplication>,
) -> Result<Json<DataResponse<JobApplication>>, AppError> {
    let draft = request.into_draft()?;
    let application = state.store.create_job_application(&draft).await?;
    info!(
        "Created job application {} ({} at {})",
        application.id, application.position, application.company
    );
    Ok(Json(DataResponse::new(application)))
}

/// GET /api/job-applications/:id
pub async fn handle_get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DataResponse<JobApplication>>, AppError> {
    let application = state
        .store
        .fetch_job_application(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(DataResponse::new(application)))
}

/// PATCH /api/job-applications/:id
pub async fn handle_update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<JobApplicationPatch>,
) -> Result<Json<DataResponse<JobApplication>>, AppError> {
    let application = state
        .store
        .update_job_application(id, &patch)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(DataResponse::new(application)))
}

/// DELETE /api/job-applications/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.store.delete_job_application(id).await? {
        return Err(not_found());
    }
    info!("Deleted job application {id}");
    Ok(Json(SuccessResponse::ok()))
}

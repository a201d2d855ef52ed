//! Axum route handlers for AI refinement.

use axum::{
    extract::State,
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::refinement::commit::{apply_refinements, ApplyRequest, CommitOutcome};
use crate::refinement::coordinator::{refine_dry_run, DryRunOutcome, RefineRequest};
use crate::state::AppState;

/// POST /api/resume/refine-with-ai
///
/// Returns a candidate without saving it. Consumes one unit of quota per attempt.
pub async fn handle_refine(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefineRequest>,
) -> Result<Json<DryRunOutcome>, AppError> {
    let outcome = refine_dry_run(
        state.store.as_ref(),
        state.llm.as_deref(),
        state.owner_id,
        &request,
    )
    .await?;
    Ok(Json(outcome))
}

/// POST /api/resume/:id/apply-ai-refinements
pub async fn handle_apply_refinements(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ApplyRequest>,
) -> Result<Json<CommitOutcome>, AppError> {
    let outcome = apply_refinements(state.store.as_ref(), state.owner_id, id, request).await?;
    Ok(Json(outcome))
}

//! Quota endpoints for the single owner.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::routes::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiCallsLimit {
    pub ai_calls_limit: i32,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub data: AiCallsLimit,
    pub message: &'static str,
}

/// GET /api/user/ai-calls-limit
pub async fn handle_get_ai_calls_limit(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<AiCallsLimit>>, AppError> {
    let user = state
        .store
        .fetch_user(state.owner_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(DataResponse::new(AiCallsLimit {
        ai_calls_limit: user.ai_calls_limit,
    })))
}

/// POST /api/user/reset-ai-limit
///
/// Restores the configured quota.
pub async fn handle_reset_ai_limit(
    State(state): State<AppState>,
) -> Result<Json<ResetResponse>, AppError> {
    let ai_calls_limit = state
        .store
        .reset_ai_calls(state.owner_id, state.config.ai_calls_limit)
        .await?;
    info!("Reset AI calls limit to {ai_calls_limit}");
    Ok(Json(ResetResponse {
        success: true,
        data: AiCallsLimit { ai_calls_limit },
        message: "AI calls limit reset successfully",
    }))
}

pub mod health;

use axum::{
    http::{header, HeaderName},
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::account::handlers as account;
use crate::job_applications::handlers as job_applications;
use crate::refinement::handlers as refinement;
use crate::resume::handlers as resume;
use crate::state::AppState;

/// Headers for responses that must never be served from a cache.
pub const NO_STORE_HEADERS: [(HeaderName, &str); 3] = [
    (
        header::CACHE_CONTROL,
        "no-store, no-cache, must-revalidate, proxy-revalidate",
    ),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resume API
        .route("/api/resumes", get(resume::handle_list_resumes))
        .route("/api/resume/create", post(resume::handle_create_resume))
        .route(
            "/api/resume/create-with-title",
            post(resume::handle_create_with_title),
        )
        .route(
            "/api/resume/:id",
            get(resume::handle_get_resume)
                .patch(resume::handle_patch_resume)
                .delete(resume::handle_delete_resume),
        )
        .route(
            "/api/resume/:id/duplicate",
            post(resume::handle_duplicate_resume),
        )
        // Refinement API
        .route(
            "/api/resume/refine-with-ai",
            post(refinement::handle_refine),
        )
        .route(
            "/api/resume/:id/apply-ai-refinements",
            post(refinement::handle_apply_refinements),
        )
        // Job application API
        .route(
            "/api/job-applications",
            get(job_applications::handle_list).post(job_applications::handle_create),
        )
        .route(
            "/api/job-applications/:id",
            get(job_applications::handle_get)
                .patch(job_applications::handle_update)
                .delete(job_applications::handle_delete),
        )
        // Account API
        .route(
            "/api/user/ai-calls-limit",
            get(account::handle_get_ai_calls_limit),
        )
        .route(
            "/api/user/reset-ai-limit",
            post(account::handle_reset_ai_limit),
        )
        .with_state(state)
}

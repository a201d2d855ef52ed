use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The owner of resumes. The service runs with exactly one, resolved at startup.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub ai_calls_limit: i32,
    pub created_at: DateTime<Utc>,
}

/// Raw model output kept for manual recovery of a refinement.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AiResponseRow {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub prompt: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

/// Refinements exactly as committed, keyed by the resume they produced.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AiRefinementRow {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub job_application_id: Uuid,
    pub refinements: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

//! Dry-run refinement: ask the model for a tailored version of a resume without
//! writing anything but the quota decrement and an audit row.
//!
//! Exactly one model call per request. Whatever happens after the quota check,
//! one unit of quota is consumed: a call that fails or returns unparseable text
//! falls back to the original resume with a warning instead of failing the request.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::ChatCompletion;
use crate::models::resume::Resume;
use crate::refinement::candidate::RefinementCandidate;
use crate::refinement::prompts::{build_refinement_prompt, refinement_system_prompt};
use crate::refinement::repair::parse_model_json;
use crate::store::Store;

pub const FALLBACK_WARNING: &str =
    "AI refinement encountered an error. Showing the original resume unchanged.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineRequest {
    pub resume_id: Option<String>,
    pub job_description: Option<String>,
    pub job_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinedDraft {
    pub data: RefinementCandidate,
    pub original_resume: Resume,
    pub remaining_calls: i32,
    pub raw_response: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackDraft {
    pub data: Resume,
    pub original_resume: Resume,
    pub remaining_calls: i32,
    pub warning: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DryRunOutcome {
    Refined(RefinedDraft),
    Fallback(FallbackDraft),
}

/// Parses an identifier coming from a request body.
pub(crate) fn parse_id(raw: Option<&str>, missing: &str, label: &str) -> Result<Uuid, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation(missing.to_string()))?;
    Uuid::parse_str(raw).map_err(|_| AppError::Validation(format!("Invalid {label}: {raw}")))
}

pub async fn refine_dry_run<S: Store + ?Sized>(
    store: &S,
    llm: Option<&dyn ChatCompletion>,
    owner_id: Uuid,
    request: &RefineRequest,
) -> Result<DryRunOutcome, AppError> {
    let resume_id = parse_id(
        request.resume_id.as_deref(),
        "Resume ID is required",
        "resume ID",
    )?;

    let owner = store
        .fetch_user(owner_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    if owner.ai_calls_limit <= 0 {
        return Err(AppError::QuotaExhausted);
    }

    let resume = store
        .fetch_resume(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))?;

    let llm = llm.ok_or_else(|| {
        AppError::Upstream("OpenAI API key is not configured".to_string())
    })?;

    let prompt = build_refinement_prompt(
        &resume,
        request.job_description.as_deref(),
        request.job_url.as_deref(),
    );
    let system = refinement_system_prompt();

    let raw = match llm.complete(&system, &prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Refinement call for resume {resume_id} failed: {e}");
            return fallback(store, owner_id, resume).await;
        }
    };

    let candidate = match parse_model_json(&raw) {
        Ok(map) => RefinementCandidate::from_map(&map),
        Err(e) => {
            let preview: String = raw.chars().take(200).collect();
            warn!("Refinement response for resume {resume_id} unusable: {e}; preview: {preview}");
            return fallback(store, owner_id, resume).await;
        }
    };

    let remaining_calls = store.consume_ai_call(owner_id).await?;

    if let Err(e) = store.record_ai_response(resume_id, &prompt, &raw).await {
        error!("Failed to store model response for resume {resume_id}: {e}");
    }

    info!(
        "Refined resume {resume_id}: {} work, {} skills, {} projects, {} education; {remaining_calls} calls left",
        candidate.work.as_ref().map_or(0, Vec::len),
        candidate.skills.as_ref().map_or(0, Vec::len),
        candidate.projects.as_ref().map_or(0, Vec::len),
        candidate.education.as_ref().map_or(0, Vec::len),
    );

    Ok(DryRunOutcome::Refined(RefinedDraft {
        data: candidate,
        original_resume: resume,
        remaining_calls,
        raw_response: raw,
    }))
}

async fn fallback<S: Store + ?Sized>(
    store: &S,
    owner_id: Uuid,
    resume: Resume,
) -> Result<DryRunOutcome, AppError> {
    let remaining_calls = store.consume_ai_call(owner_id).await?;
    Ok(DryRunOutcome::Fallback(FallbackDraft {
        data: resume.clone(),
        original_resume: resume,
        remaining_calls,
        warning: FALLBACK_WARNING.to_string(),
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::llm_client::LlmError;
    use crate::resume::service::create_resume;
    use crate::store::{AccountStore, MemoryStore, ResumeStore};

    /// Replies with a fixed text (or a failure) and counts calls.
    pub(crate) struct ScriptedModel {
        reply: Option<String>,
        pub calls: AtomicUsize,
    }

    impl ScriptedModel {
        pub(crate) fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatCompletion for ScriptedModel {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().ok_or(LlmError::Api {
                status: 500,
                message: "upstream exploded".to_string(),
            })
        }
    }

    async fn setup(limit: i32) -> (MemoryStore, Uuid, Resume) {
        let store = MemoryStore::new();
        let owner = store
            .ensure_owner("anonymous@example.com", limit)
            .await
            .unwrap();
        let resume = create_resume(&store, owner.id).await.unwrap();
        (store, owner.id, resume)
    }

    fn request_for(resume: &Resume) -> RefineRequest {
        RefineRequest {
            resume_id: Some(resume.id().to_string()),
            job_description: Some("Senior Rust engineer, async services".to_string()),
            job_url: None,
        }
    }

    async fn remaining(store: &MemoryStore, owner: Uuid) -> i32 {
        store.fetch_user(owner).await.unwrap().unwrap().ai_calls_limit
    }

    #[tokio::test]
    async fn test_success_normalizes_and_consumes_one_call() {
        let (store, owner, resume) = setup(3).await;
        let model = ScriptedModel::replying(
            "```json\n{\"summary\": \"Rust services engineer\", \
             \"skills\": [\"Rust\", {\"name\": {\"name\": \"Tokio\"}}], \
             \"work\": [{\"company\": \"Northwind Logistics\", \"title\": \"Senior Backend Engineer\", \
             \"badges\": [\"Rust\"], \"tasks\": [\"Built ingest\"]}]}\n```",
        );

        let outcome = refine_dry_run(&store, Some(&model), owner, &request_for(&resume))
            .await
            .unwrap();

        let DryRunOutcome::Refined(draft) = outcome else {
            panic!("expected a refined draft");
        };
        assert_eq!(draft.remaining_calls, 2);
        assert_eq!(remaining(&store, owner).await, 2);
        assert_eq!(draft.data.summary.as_deref(), Some("Rust services engineer"));
        let skills: Vec<String> = draft.data.skills.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(skills, vec!["Rust", "Tokio"]);
        assert_eq!(draft.original_resume, resume);
        assert!(draft.raw_response.starts_with("```json"));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        let audit = store.ai_responses().await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].resume_id, resume.id());
        assert!(audit[0].prompt.contains("Senior Rust engineer"));

        // Dry run writes nothing to the resume itself.
        assert_eq!(store.fetch_resume(resume.id()).await.unwrap().unwrap(), resume);
    }

    #[tokio::test]
    async fn test_unparseable_response_falls_back_and_still_consumes() {
        let (store, owner, resume) = setup(3).await;
        let model = ScriptedModel::replying("Sorry, I can't do that.");

        let outcome = refine_dry_run(&store, Some(&model), owner, &request_for(&resume))
            .await
            .unwrap();

        let DryRunOutcome::Fallback(fallback) = outcome else {
            panic!("expected a fallback");
        };
        assert_eq!(fallback.data, resume);
        assert_eq!(fallback.original_resume, resume);
        assert_eq!(fallback.warning, FALLBACK_WARNING);
        assert_eq!(fallback.remaining_calls, 2);
        assert_eq!(remaining(&store, owner).await, 2);
        assert!(store.ai_responses().await.is_empty());

        let body = serde_json::to_value(DryRunOutcome::Fallback(fallback)).unwrap();
        assert!(body.get("warning").is_some());
        assert!(body.get("rawResponse").is_none());
    }

    #[tokio::test]
    async fn test_call_failure_falls_back() {
        let (store, owner, resume) = setup(1).await;
        let model = ScriptedModel::failing();

        let outcome = refine_dry_run(&store, Some(&model), owner, &request_for(&resume))
            .await
            .unwrap();
        assert!(matches!(outcome, DryRunOutcome::Fallback(_)));
        assert_eq!(remaining(&store, owner).await, 0);

        // The next attempt is refused before the model is called.
        let err = refine_dry_run(&store, Some(&model), owner, &request_for(&resume))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::QuotaExhausted));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_validation() {
        let (store, owner, _) = setup(3).await;
        let model = ScriptedModel::replying("{}");

        let err = refine_dry_run(&store, Some(&model), owner, &RefineRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let missing = RefineRequest {
            resume_id: Some(Uuid::new_v4().to_string()),
            ..Default::default()
        };
        let err = refine_dry_run(&store, Some(&model), owner, &missing)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(remaining(&store, owner).await, 3);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_model_is_upstream_error_without_consuming() {
        let (store, owner, resume) = setup(3).await;
        let err = refine_dry_run(&store, None, owner, &request_for(&resume))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
        assert_eq!(remaining(&store, owner).await, 3);
    }
}

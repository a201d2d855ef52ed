//! Commit of a refinement: the candidate is merged over the original into a brand-new
//! resume, and the job application is repointed at it. The original is never modified.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::Resume;
use crate::refinement::candidate::RefinementCandidate;
use crate::refinement::coordinator::parse_id;
use crate::resume::drafts::{EducationDraft, ProjectDraft, ResumeDraft, WorkDraft};
use crate::resume::normalize::NamedEntry;
use crate::store::Store;

pub const REFINED_SUFFIX: &str = " (AI Refined)";
pub const COMMIT_MESSAGE: &str = "Created a new AI-refined resume and updated the job application";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub refinements: Option<Value>,
    pub job_application_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommitOutcome {
    pub data: Resume,
    pub refinements: Value,
    pub message: &'static str,
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

fn present(value: &str) -> bool {
    !value.trim().is_empty()
}

fn merge_work(entry: &WorkDraft) -> Option<WorkDraft> {
    if !present(&entry.company) || !present(&entry.title) {
        warn!("Skipping refined work entry without company or title");
        return None;
    }
    let mut entry = entry.clone();
    if !present(&entry.description) {
        entry.description = format!("{} at {}", entry.title, entry.company);
    }
    if entry.badges.is_empty() {
        if let Some(first) = entry.title.split_whitespace().next() {
            entry.badges.push(NamedEntry::new(first));
        }
    }
    Some(entry)
}

fn merge_project(entry: &ProjectDraft) -> Option<ProjectDraft> {
    if !present(&entry.title) {
        warn!("Skipping refined project without a title");
        return None;
    }
    let mut entry = entry.clone();
    if filled(&entry.description).is_none() {
        entry.description = Some(format!("Project: {}", entry.title));
    }
    Some(entry)
}

fn merge_education(candidate: &[EducationDraft], original: Vec<EducationDraft>) -> Vec<EducationDraft> {
    let valid: Vec<EducationDraft> = candidate
        .iter()
        .filter(|e| present(&e.school) && present(&e.degree))
        .cloned()
        .collect();
    if valid.is_empty() {
        warn!("No usable education entries in refinements; keeping the original ones");
        original
    } else {
        valid
    }
}

/// Builds the new resume from the original and the candidate.
///
/// Scalars come from the candidate when it has non-blank text, contact details and
/// the remaining header fields are copied, collections absent from the candidate are
/// copied from the original.
pub fn merge_refinements(
    original: &Resume,
    candidate: &RefinementCandidate,
    owner_id: Uuid,
) -> ResumeDraft {
    let base = ResumeDraft::from_resume(original);
    let h = &original.header;

    let title_root = filled(&candidate.title)
        .or(Some(h.title.as_str()).filter(|t| present(t)))
        .unwrap_or(h.name.as_str());

    ResumeDraft {
        user_id: Some(owner_id),
        name: filled(&candidate.name).unwrap_or(&h.name).to_string(),
        title: format!("{title_root}{REFINED_SUFFIX}"),
        location: filled(&candidate.location)
            .map(str::to_string)
            .or_else(|| h.location.clone()),
        summary: filled(&candidate.summary).unwrap_or(&h.summary).to_string(),
        education: match &candidate.education {
            Some(list) => merge_education(list, base.education),
            None => base.education,
        },
        work: match &candidate.work {
            Some(list) => list.iter().filter_map(merge_work).collect(),
            None => base.work,
        },
        skills: candidate.skills.clone().unwrap_or(base.skills),
        projects: match &candidate.projects {
            Some(list) => list.iter().filter_map(merge_project).collect(),
            None => base.projects,
        },
        ..base
    }
}

pub async fn apply_refinements<S: Store + ?Sized>(
    store: &S,
    owner_id: Uuid,
    resume_id: Uuid,
    request: ApplyRequest,
) -> Result<CommitOutcome, AppError> {
    let refinements = match request.refinements {
        None | Some(Value::Null) => {
            return Err(AppError::Validation("Refinements are required".to_string()))
        }
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(AppError::Validation(
                "Refinements must be a JSON object".to_string(),
            ))
        }
    };
    let job_application_id = parse_id(
        request.job_application_id.as_deref(),
        "Job application ID is required",
        "job application ID",
    )?;

    let original = store
        .fetch_resume(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))?;
    if store
        .fetch_job_application(job_application_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("Job application not found".to_string()));
    }

    let candidate = RefinementCandidate::from_map(&refinements);
    let draft = merge_refinements(&original, &candidate, owner_id);
    let created = store.create_resume(&draft).await?;
    info!(
        "Created refined resume {} from {resume_id} ({} work, {} education, {} projects)",
        created.id(),
        created.work.len(),
        created.education.len(),
        created.projects.len()
    );

    store
        .repoint_job_application(job_application_id, created.id())
        .await?
        .ok_or_else(|| AppError::NotFound("Job application not found".to_string()))?;

    let refinements = Value::Object(refinements);
    if let Err(e) = store
        .record_refinement(created.id(), job_application_id, &refinements)
        .await
    {
        error!("Failed to store refinements for resume {}: {e}", created.id());
    }

    Ok(CommitOutcome {
        data: created,
        refinements,
        message: COMMIT_MESSAGE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job_application::JobApplicationDraft;
    use crate::resume::service::create_resume;
    use crate::store::{JobApplicationStore, MemoryStore, ResumeStore};
    use chrono::Utc;
    use serde_json::json;

    async fn setup() -> (MemoryStore, Uuid, Resume, Uuid) {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let resume = create_resume(&store, owner).await.unwrap();
        let application = store
            .create_job_application(&JobApplicationDraft {
                resume_id: resume.id(),
                company: "Initech".to_string(),
                position: "Staff Engineer".to_string(),
                status: "Applied".to_string(),
                applied_date: Utc::now(),
                job_url: None,
                job_description: None,
            })
            .await
            .unwrap();
        (store, owner, resume, application.id)
    }

    fn candidate(value: Value) -> RefinementCandidate {
        RefinementCandidate::from_map(value.as_object().unwrap())
    }

    #[tokio::test]
    async fn test_merge_scalars_and_title_suffix() {
        let (_, owner, original, _) = setup().await;

        let draft = merge_refinements(
            &original,
            &candidate(json!({"name": "", "summary": "Tailored summary", "location": "  "})),
            owner,
        );
        assert_eq!(draft.name, original.header.name);
        assert_eq!(draft.summary, "Tailored summary");
        assert_eq!(draft.location, original.header.location);
        assert_eq!(draft.title, format!("{} (AI Refined)", original.header.title));
        assert_eq!(draft.contact, ResumeDraft::from_resume(&original).contact);
        assert_eq!(draft.about, original.header.about);

        let draft = merge_refinements(&original, &candidate(json!({"title": "Rust Lead"})), owner);
        assert_eq!(draft.title, "Rust Lead (AI Refined)");
    }

    #[tokio::test]
    async fn test_title_falls_back_to_name() {
        let (_, owner, mut original, _) = setup().await;
        original.header.title = String::new();
        let draft = merge_refinements(&original, &RefinementCandidate::default(), owner);
        assert_eq!(draft.title, format!("{} (AI Refined)", original.header.name));
    }

    #[tokio::test]
    async fn test_merge_collections() {
        let (_, owner, original, _) = setup().await;
        let draft = merge_refinements(
            &original,
            &candidate(json!({
                "work": [
                    {"company": "Acme", "title": "Platform Engineer", "badges": [], "tasks": ["Ran on-call"]},
                    {"company": "", "title": "Ghost"}
                ],
                "projects": [{"title": "ledger"}, {"description": "no title"}],
                "education": [{"school": "", "degree": "BSc"}]
            })),
            owner,
        );

        assert_eq!(draft.work.len(), 1);
        assert_eq!(draft.work[0].description, "Platform Engineer at Acme");
        assert_eq!(draft.work[0].badges, vec![NamedEntry::new("Platform")]);
        assert_eq!(draft.projects.len(), 1);
        assert_eq!(draft.projects[0].description.as_deref(), Some("Project: ledger"));
        // No education entry qualified, so the original list is kept.
        assert_eq!(draft.education, ResumeDraft::from_resume(&original).education);
        // Skills were absent from the candidate.
        assert_eq!(draft.skills, ResumeDraft::from_resume(&original).skills);
    }

    #[tokio::test]
    async fn test_apply_creates_new_resume_and_repoints_application() {
        let (store, owner, original, application_id) = setup().await;
        let refinements = json!({
            "summary": "Tailored summary",
            "skills": [{"name": "Rust"}, "Tokio"]
        });

        let outcome = apply_refinements(
            &store,
            owner,
            original.id(),
            ApplyRequest {
                refinements: Some(refinements.clone()),
                job_application_id: Some(application_id.to_string()),
            },
        )
        .await
        .unwrap();

        assert_ne!(outcome.data.id(), original.id());
        assert_eq!(outcome.data.header.summary, "Tailored summary");
        let skills: Vec<&str> = outcome.data.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(skills, vec!["Rust", "Tokio"]);
        assert_eq!(outcome.data.work.len(), original.work.len());
        assert_eq!(outcome.refinements, refinements);
        assert_eq!(outcome.message, COMMIT_MESSAGE);

        // The original is untouched.
        assert_eq!(store.fetch_resume(original.id()).await.unwrap().unwrap(), original);

        let application = store
            .fetch_job_application(application_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(application.resume_id, outcome.data.id());

        let audit = store.refinements().await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].resume_id, outcome.data.id());
        assert_eq!(audit[0].job_application_id, application_id);
    }

    #[tokio::test]
    async fn test_apply_validation_and_missing_targets() {
        let (store, owner, original, application_id) = setup().await;

        let err = apply_refinements(
            &store,
            owner,
            original.id(),
            ApplyRequest {
                refinements: None,
                job_application_id: Some(application_id.to_string()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = apply_refinements(
            &store,
            owner,
            original.id(),
            ApplyRequest {
                refinements: Some(json!({})),
                job_application_id: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = apply_refinements(
            &store,
            owner,
            original.id(),
            ApplyRequest {
                refinements: Some(json!({})),
                job_application_id: Some(Uuid::new_v4().to_string()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = apply_refinements(
            &store,
            owner,
            Uuid::new_v4(),
            ApplyRequest {
                refinements: Some(json!({})),
                job_application_id: Some(application_id.to_string()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // Nothing was created along the way.
        assert_eq!(store.list_resumes(owner).await.unwrap().len(), 1);
    }
}

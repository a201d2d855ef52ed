use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

pub const DEFAULT_STATUS: &str = "Applied";

/// Minimal view of the resume a job application points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRef {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub company: String,
    pub position: String,
    pub status: String,
    pub applied_date: DateTime<Utc>,
    pub job_url: Option<String>,
    pub job_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resume: Option<ResumeRef>,
}

/// Row shape joined with the referenced resume's title.
#[derive(Debug, Clone, FromRow)]
pub struct JobApplicationRow {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub company: String,
    pub position: String,
    pub status: String,
    pub applied_date: DateTime<Utc>,
    pub job_url: Option<String>,
    pub job_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resume_title: Option<String>,
}

impl From<JobApplicationRow> for JobApplication {
    fn from(row: JobApplicationRow) -> Self {
        JobApplication {
            resume: row.resume_title.map(|title| ResumeRef {
                id: row.resume_id,
                title,
            }),
            id: row.id,
            resume_id: row.resume_id,
            company: row.company,
            position: row.position,
            status: row.status,
            applied_date: row.applied_date,
            job_url: row.job_url,
            job_description: row.job_description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJobApplication {
    pub resume_id: Option<Uuid>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub status: Option<String>,
    pub applied_date: Option<DateTime<Utc>>,
    pub job_url: Option<String>,
    pub job_description: Option<String>,
}

/// A validated application ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct JobApplicationDraft {
    pub resume_id: Uuid,
    pub company: String,
    pub position: String,
    pub status: String,
    pub applied_date: DateTime<Utc>,
    pub job_url: Option<String>,
    pub job_description: Option<String>,
}

impl NewJobApplication {
    /// Checks the required fields and fills in status and applied date defaults.
    pub fn into_draft(self) -> Result<JobApplicationDraft, AppError> {
        let company = self.company.filter(|s| !s.trim().is_empty());
        let position = self.position.filter(|s| !s.trim().is_empty());
        let (Some(resume_id), Some(company), Some(position)) = (self.resume_id, company, position)
        else {
            return Err(AppError::Validation(
                "Missing required fields: resumeId, company, position".to_string(),
            ));
        };

        Ok(JobApplicationDraft {
            resume_id,
            company,
            position,
            status: self
                .status
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            applied_date: self.applied_date.unwrap_or_else(Utc::now),
            job_url: self.job_url,
            job_description: self.job_description,
        })
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplicationPatch {
    pub resume_id: Option<Uuid>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub status: Option<String>,
    pub applied_date: Option<DateTime<Utc>>,
    pub job_url: Option<String>,
    pub job_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(resume_id: Option<Uuid>, company: &str, position: &str) -> NewJobApplication {
        NewJobApplication {
            resume_id,
            company: Some(company.to_string()),
            position: Some(position.to_string()),
            status: None,
            applied_date: None,
            job_url: None,
            job_description: None,
        }
    }

    #[test]
    fn test_into_draft_applies_defaults() {
        let id = Uuid::new_v4();
        let draft = request(Some(id), "Acme", "Engineer").into_draft().unwrap();
        assert_eq!(draft.resume_id, id);
        assert_eq!(draft.status, DEFAULT_STATUS);
        assert!(draft.applied_date <= Utc::now());
    }

    #[test]
    fn test_into_draft_requires_fields() {
        assert!(matches!(
            request(None, "Acme", "Engineer").into_draft(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            request(Some(Uuid::new_v4()), "  ", "Engineer").into_draft(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_resume_ref_only_when_title_joined() {
        let now = Utc::now();
        let row = JobApplicationRow {
            id: Uuid::new_v4(),
            resume_id: Uuid::new_v4(),
            company: "Acme".into(),
            position: "Engineer".into(),
            status: DEFAULT_STATUS.into(),
            applied_date: now,
            job_url: None,
            job_description: None,
            created_at: now,
            updated_at: now,
            resume_title: None,
        };
        let app: JobApplication = row.clone().into();
        assert!(app.resume.is_none());

        let app: JobApplication = JobApplicationRow {
            resume_title: Some("Backend".into()),
            ..row
        }
        .into();
        assert_eq!(app.resume.unwrap().title, "Backend");
    }
}

//! Persistence seams. Every handler and service talks to storage through these traits.
//!
//! Writes are addressed by entity id. Positional addressing (`["work", 1]`) is resolved to an
//! id by the caller against a snapshot it fetched first, so backends never see indices.
//!
//! `AppState` carries an `Arc<dyn Store>`; `PgStore` backs production and `MemoryStore`
//! backs tests and database-less local runs.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job_application::{JobApplication, JobApplicationDraft, JobApplicationPatch};
use crate::models::resume::{Resume, ResumeListing};
use crate::models::user::User;
use crate::resume::drafts::{EducationDraft, LinkDraft, ProjectDraft, ResumeDraft, SocialDraft, WorkDraft};
use crate::resume::normalize::{NamedEntry, TaskEntry};
use crate::resume::path::{
    ContactField, EducationField, ProjectField, ResumeField, SocialField, WorkField,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Contact changes. `None` leaves a field untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactUpdate {
    pub email: Option<Option<String>>,
    pub tel: Option<Option<String>>,
    /// When present, the whole social-link collection is replaced in order.
    pub social: Option<Vec<SocialDraft>>,
}

impl ContactUpdate {
    pub fn field(field: ContactField, value: Option<String>) -> Self {
        match field {
            ContactField::Email => ContactUpdate {
                email: Some(value),
                ..Default::default()
            },
            ContactField::Tel => ContactUpdate {
                tel: Some(value),
                ..Default::default()
            },
        }
    }

    pub fn socials(social: Vec<SocialDraft>) -> Self {
        ContactUpdate {
            social: Some(social),
            ..Default::default()
        }
    }
}

/// Every top-level change of a whole-document patch, decoded and checked up front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpdate {
    pub scalars: Vec<(ResumeField, Option<String>)>,
    pub contact: Option<ContactUpdate>,
    pub education: Option<Vec<EducationDraft>>,
    pub work: Option<Vec<WorkDraft>>,
    pub skills: Option<Vec<NamedEntry>>,
    pub projects: Option<Vec<ProjectDraft>>,
}

impl DocumentUpdate {
    pub fn is_empty(&self) -> bool {
        *self == DocumentUpdate::default()
    }
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// Full snapshot with every descendant, children in creation order.
    async fn fetch_resume(&self, id: Uuid) -> Result<Option<Resume>, AppError>;

    /// Owner's resumes, most recently updated first.
    async fn list_resumes(&self, owner_id: Uuid) -> Result<Vec<ResumeListing>, AppError>;

    async fn latest_resume(&self, owner_id: Uuid) -> Result<Option<Resume>, AppError>;

    /// Inserts a resume and its whole tree atomically under fresh ids.
    async fn create_resume(&self, draft: &ResumeDraft) -> Result<Resume, AppError>;

    /// Deletes a resume and every descendant. `false` when nothing was deleted.
    async fn delete_resume(&self, id: Uuid) -> Result<bool, AppError>;

    async fn update_scalars(
        &self,
        id: Uuid,
        updates: &[(ResumeField, Option<String>)],
    ) -> Result<(), AppError>;

    /// Applies every part of `update` or none of it.
    async fn apply_document(&self, resume_id: Uuid, update: &DocumentUpdate) -> Result<(), AppError>;

    /// Applies a contact change, creating the contact row first when the resume has none.
    async fn update_contact(&self, resume_id: Uuid, update: &ContactUpdate) -> Result<(), AppError>;

    async fn update_social_field(
        &self,
        resume_id: Uuid,
        social_id: Uuid,
        field: SocialField,
        value: String,
    ) -> Result<(), AppError>;

    async fn replace_education(
        &self,
        resume_id: Uuid,
        entries: &[EducationDraft],
    ) -> Result<(), AppError>;

    async fn update_education(
        &self,
        resume_id: Uuid,
        education_id: Uuid,
        entry: &EducationDraft,
    ) -> Result<(), AppError>;

    async fn update_education_field(
        &self,
        resume_id: Uuid,
        education_id: Uuid,
        field: EducationField,
        value: Option<String>,
    ) -> Result<(), AppError>;

    async fn replace_skills(&self, resume_id: Uuid, skills: &[NamedEntry]) -> Result<(), AppError>;

    async fn replace_work(&self, resume_id: Uuid, entries: &[WorkDraft]) -> Result<(), AppError>;

    /// Deletes one work entry with its badges and tasks and recreates it from `entry`,
    /// keeping its position in the collection.
    async fn recreate_work(
        &self,
        resume_id: Uuid,
        work_id: Uuid,
        entry: &WorkDraft,
    ) -> Result<(), AppError>;

    async fn update_work_field(
        &self,
        resume_id: Uuid,
        work_id: Uuid,
        field: WorkField,
        value: Option<String>,
    ) -> Result<(), AppError>;

    async fn replace_badges(
        &self,
        resume_id: Uuid,
        work_id: Uuid,
        badges: &[NamedEntry],
    ) -> Result<(), AppError>;

    async fn replace_tasks(
        &self,
        resume_id: Uuid,
        work_id: Uuid,
        tasks: &[TaskEntry],
    ) -> Result<(), AppError>;

    async fn replace_projects(
        &self,
        resume_id: Uuid,
        entries: &[ProjectDraft],
    ) -> Result<(), AppError>;

    async fn recreate_project(
        &self,
        resume_id: Uuid,
        project_id: Uuid,
        entry: &ProjectDraft,
    ) -> Result<(), AppError>;

    async fn update_project_field(
        &self,
        resume_id: Uuid,
        project_id: Uuid,
        field: ProjectField,
        value: Option<String>,
    ) -> Result<(), AppError>;

    async fn replace_tech_stack(
        &self,
        resume_id: Uuid,
        project_id: Uuid,
        tech: &[NamedEntry],
    ) -> Result<(), AppError>;

    /// Removes any existing link and stores `link` when given.
    async fn replace_project_link(
        &self,
        resume_id: Uuid,
        project_id: Uuid,
        link: Option<&LinkDraft>,
    ) -> Result<(), AppError>;
}

#[async_trait]
pub trait JobApplicationStore: Send + Sync {
    /// All applications, most recently updated first.
    async fn list_job_applications(&self) -> Result<Vec<JobApplication>, AppError>;

    async fn fetch_job_application(&self, id: Uuid) -> Result<Option<JobApplication>, AppError>;

    async fn create_job_application(
        &self,
        draft: &JobApplicationDraft,
    ) -> Result<JobApplication, AppError>;

    /// `None` when the application does not exist.
    async fn update_job_application(
        &self,
        id: Uuid,
        patch: &JobApplicationPatch,
    ) -> Result<Option<JobApplication>, AppError>;

    async fn delete_job_application(&self, id: Uuid) -> Result<bool, AppError>;

    /// Points an application at a different resume.
    async fn repoint_job_application(
        &self,
        id: Uuid,
        resume_id: Uuid,
    ) -> Result<Option<JobApplication>, AppError> {
        let patch = JobApplicationPatch {
            resume_id: Some(resume_id),
            ..Default::default()
        };
        self.update_job_application(id, &patch).await
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Returns the owner with `email`, creating it with `ai_calls_limit` when absent.
    async fn ensure_owner(&self, email: &str, ai_calls_limit: i32) -> Result<User, AppError>;

    async fn fetch_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Decrements the remaining refinement calls by one (never below zero) and returns
    /// the new value.
    async fn consume_ai_call(&self, user_id: Uuid) -> Result<i32, AppError>;

    async fn reset_ai_calls(&self, user_id: Uuid, ai_calls_limit: i32) -> Result<i32, AppError>;

    async fn record_ai_response(
        &self,
        resume_id: Uuid,
        prompt: &str,
        response: &str,
    ) -> Result<(), AppError>;

    async fn record_refinement(
        &self,
        resume_id: Uuid,
        job_application_id: Uuid,
        refinements: &Value,
    ) -> Result<(), AppError>;
}

/// Everything the HTTP layer needs from persistence.
pub trait Store: ResumeStore + JobApplicationStore + AccountStore {}

impl<T> Store for T where T: ResumeStore + JobApplicationStore + AccountStore {}

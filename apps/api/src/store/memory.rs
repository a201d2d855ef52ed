//! Process-local store. Each resume is held as one owned tree, so a mutation is a plain
//! in-place edit under the write lock and can never be observed half-applied.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job_application::{
    JobApplication, JobApplicationDraft, JobApplicationPatch, ResumeRef,
};
use crate::models::resume::{
    Badge, Contact, Education, Project, ProjectLink, Resume, ResumeHeader, ResumeListing, Skill,
    Social, Task, TechTag, Work,
};
use crate::models::user::{AiRefinementRow, AiResponseRow, User};
use crate::resume::drafts::{
    ContactDraft, EducationDraft, LinkDraft, ProjectDraft, ResumeDraft, SocialDraft, WorkDraft,
};
use crate::resume::normalize::{NamedEntry, TaskEntry};
use crate::resume::path::{EducationField, ProjectField, ResumeField, SocialField, WorkField};

use super::{AccountStore, ContactUpdate, DocumentUpdate, JobApplicationStore, ResumeStore};

#[derive(Default)]
pub struct MemoryStore {
    resumes: RwLock<Vec<Resume>>,
    users: RwLock<Vec<User>>,
    job_applications: RwLock<Vec<JobApplication>>,
    ai_responses: RwLock<Vec<AiResponseRow>>,
    refinements: RwLock<Vec<AiRefinementRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn mutate<F>(&self, resume_id: Uuid, f: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut Resume) -> Result<(), AppError> + Send,
    {
        let mut resumes = self.resumes.write().await;
        let resume = resumes
            .iter_mut()
            .find(|r| r.id() == resume_id)
            .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))?;
        f(resume)?;
        resume.header.updated_at = Utc::now();
        Ok(())
    }

    async fn with_resume_title(&self, mut app: JobApplication) -> JobApplication {
        let resumes = self.resumes.read().await;
        app.resume = resumes
            .iter()
            .find(|r| r.id() == app.resume_id)
            .map(|r| ResumeRef {
                id: r.id(),
                title: r.header.title.clone(),
            });
        app
    }
}

#[cfg(test)]
impl MemoryStore {
    pub async fn ai_responses(&self) -> Vec<AiResponseRow> {
        self.ai_responses.read().await.clone()
    }

    pub async fn refinements(&self) -> Vec<AiRefinementRow> {
        self.refinements.read().await.clone()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Draft → entity
// ────────────────────────────────────────────────────────────────────────────

fn build_contact(resume_id: Uuid, draft: &ContactDraft) -> Contact {
    let id = Uuid::new_v4();
    Contact {
        id,
        resume_id,
        email: draft.email.clone(),
        tel: draft.tel.clone(),
        social: build_socials(id, &draft.social),
    }
}

fn build_socials(contact_id: Uuid, drafts: &[SocialDraft]) -> Vec<Social> {
    drafts
        .iter()
        .map(|s| Social {
            id: Uuid::new_v4(),
            contact_id,
            name: s.name.clone(),
            url: s.url.clone(),
        })
        .collect()
}

fn build_education(resume_id: Uuid, draft: &EducationDraft) -> Education {
    Education {
        id: Uuid::new_v4(),
        resume_id,
        school: draft.school.clone(),
        degree: draft.degree.clone(),
        start: draft.start.clone(),
        end: draft.end.clone(),
    }
}

fn build_badges(work_id: Uuid, badges: &[NamedEntry]) -> Vec<Badge> {
    badges
        .iter()
        .map(|b| Badge {
            id: Uuid::new_v4(),
            work_id,
            name: b.name.clone(),
        })
        .collect()
}

fn build_tasks(work_id: Uuid, tasks: &[TaskEntry]) -> Vec<Task> {
    tasks
        .iter()
        .map(|t| Task {
            id: Uuid::new_v4(),
            work_id,
            description: t.description.clone(),
        })
        .collect()
}

fn build_work(resume_id: Uuid, draft: &WorkDraft) -> Work {
    let id = Uuid::new_v4();
    Work {
        id,
        resume_id,
        company: draft.company.clone(),
        link: draft.link.clone(),
        title: draft.title.clone(),
        start: draft.start.clone(),
        end: draft.end.clone(),
        description: draft.description.clone(),
        badges: build_badges(id, &draft.badges),
        tasks: build_tasks(id, &draft.tasks),
    }
}

fn build_skills(resume_id: Uuid, skills: &[NamedEntry]) -> Vec<Skill> {
    skills
        .iter()
        .map(|s| Skill {
            id: Uuid::new_v4(),
            resume_id,
            name: s.name.clone(),
        })
        .collect()
}

fn build_tech(project_id: Uuid, tech: &[NamedEntry]) -> Vec<TechTag> {
    tech.iter()
        .map(|t| TechTag {
            id: Uuid::new_v4(),
            project_id,
            name: t.name.clone(),
        })
        .collect()
}

fn build_link(project_id: Uuid, link: &LinkDraft) -> ProjectLink {
    ProjectLink {
        id: Uuid::new_v4(),
        project_id,
        label: link.label.clone(),
        href: link.href.clone(),
    }
}

fn build_project(resume_id: Uuid, draft: &ProjectDraft) -> Project {
    let id = Uuid::new_v4();
    Project {
        id,
        resume_id,
        title: draft.title.clone(),
        description: draft.description.clone(),
        tech_stack: build_tech(id, &draft.tech_stack),
        link: draft.link.as_ref().map(|l| build_link(id, l)),
    }
}

fn apply_contact(resume: &mut Resume, update: &ContactUpdate) {
    let resume_id = resume.id();
    let contact = resume
        .contact
        .get_or_insert_with(|| build_contact(resume_id, &ContactDraft::default()));
    if let Some(email) = &update.email {
        contact.email = email.clone();
    }
    if let Some(tel) = &update.tel {
        contact.tel = tel.clone();
    }
    if let Some(social) = &update.social {
        contact.social = build_socials(contact.id, social);
    }
}

fn entry_not_found(what: &str) -> AppError {
    AppError::NotFound(format!("{what} not found"))
}

fn set_resume_field(header: &mut ResumeHeader, field: ResumeField, value: Option<String>) {
    match field {
        ResumeField::Name => header.name = value.unwrap_or_default(),
        ResumeField::Title => header.title = value.unwrap_or_default(),
        ResumeField::Summary => header.summary = value.unwrap_or_default(),
        ResumeField::Initials => header.initials = value,
        ResumeField::Location => header.location = value,
        ResumeField::LocationLink => header.location_link = value,
        ResumeField::About => header.about = value,
        ResumeField::AvatarUrl => header.avatar_url = value,
        ResumeField::PersonalWebsiteUrl => header.personal_website_url = value,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ResumeStore
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ResumeStore for MemoryStore {
    async fn fetch_resume(&self, id: Uuid) -> Result<Option<Resume>, AppError> {
        let resumes = self.resumes.read().await;
        Ok(resumes.iter().find(|r| r.id() == id).cloned())
    }

    async fn list_resumes(&self, owner_id: Uuid) -> Result<Vec<ResumeListing>, AppError> {
        let resumes = self.resumes.read().await;
        let mut listing: Vec<ResumeListing> = resumes
            .iter()
            .filter(|r| r.header.user_id == Some(owner_id))
            .map(Resume::listing)
            .collect();
        listing.sort_by(|a, b| b.header.updated_at.cmp(&a.header.updated_at));
        Ok(listing)
    }

    async fn latest_resume(&self, owner_id: Uuid) -> Result<Option<Resume>, AppError> {
        let resumes = self.resumes.read().await;
        Ok(resumes
            .iter()
            .filter(|r| r.header.user_id == Some(owner_id))
            .max_by_key(|r| r.header.updated_at)
            .cloned())
    }

    async fn create_resume(&self, draft: &ResumeDraft) -> Result<Resume, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let resume = Resume {
            header: ResumeHeader {
                id,
                user_id: draft.user_id,
                name: draft.name.clone(),
                title: draft.title.clone(),
                initials: draft.initials.clone(),
                location: draft.location.clone(),
                location_link: draft.location_link.clone(),
                about: draft.about.clone(),
                summary: draft.summary.clone(),
                avatar_url: draft.avatar_url.clone(),
                personal_website_url: draft.personal_website_url.clone(),
                created_at: now,
                updated_at: now,
            },
            contact: draft.contact.as_ref().map(|c| build_contact(id, c)),
            education: draft
                .education
                .iter()
                .map(|e| build_education(id, e))
                .collect(),
            work: draft.work.iter().map(|w| build_work(id, w)).collect(),
            skills: build_skills(id, &draft.skills),
            projects: draft.projects.iter().map(|p| build_project(id, p)).collect(),
        };
        self.resumes.write().await.push(resume.clone());
        Ok(resume)
    }

    async fn delete_resume(&self, id: Uuid) -> Result<bool, AppError> {
        let mut resumes = self.resumes.write().await;
        let before = resumes.len();
        resumes.retain(|r| r.id() != id);
        let deleted = resumes.len() != before;
        if deleted {
            self.job_applications
                .write()
                .await
                .retain(|a| a.resume_id != id);
        }
        Ok(deleted)
    }

    async fn update_scalars(
        &self,
        id: Uuid,
        updates: &[(ResumeField, Option<String>)],
    ) -> Result<(), AppError> {
        self.mutate(id, |resume| {
            for (field, value) in updates {
                set_resume_field(&mut resume.header, *field, value.clone());
            }
            Ok(())
        })
        .await
    }

    async fn apply_document(&self, resume_id: Uuid, update: &DocumentUpdate) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            for (field, value) in &update.scalars {
                set_resume_field(&mut resume.header, *field, value.clone());
            }
            if let Some(contact) = &update.contact {
                apply_contact(resume, contact);
            }
            if let Some(entries) = &update.education {
                resume.education = entries
                    .iter()
                    .map(|e| build_education(resume_id, e))
                    .collect();
            }
            if let Some(entries) = &update.work {
                resume.work = entries.iter().map(|w| build_work(resume_id, w)).collect();
            }
            if let Some(skills) = &update.skills {
                resume.skills = build_skills(resume_id, skills);
            }
            if let Some(entries) = &update.projects {
                resume.projects = entries
                    .iter()
                    .map(|p| build_project(resume_id, p))
                    .collect();
            }
            Ok(())
        })
        .await
    }

    async fn update_contact(&self, resume_id: Uuid, update: &ContactUpdate) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            apply_contact(resume, update);
            Ok(())
        })
        .await
    }

    async fn update_social_field(
        &self,
        resume_id: Uuid,
        social_id: Uuid,
        field: SocialField,
        value: String,
    ) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            let social = resume
                .contact
                .as_mut()
                .and_then(|c| c.social.iter_mut().find(|s| s.id == social_id))
                .ok_or_else(|| entry_not_found("Social link"))?;
            match field {
                SocialField::Name => social.name = value,
                SocialField::Url => social.url = value,
            }
            Ok(())
        })
        .await
    }

    async fn replace_education(
        &self,
        resume_id: Uuid,
        entries: &[EducationDraft],
    ) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            resume.education = entries
                .iter()
                .map(|e| build_education(resume_id, e))
                .collect();
            Ok(())
        })
        .await
    }

    async fn update_education(
        &self,
        resume_id: Uuid,
        education_id: Uuid,
        entry: &EducationDraft,
    ) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            let education = resume
                .education
                .iter_mut()
                .find(|e| e.id == education_id)
                .ok_or_else(|| entry_not_found("Education entry"))?;
            education.school = entry.school.clone();
            education.degree = entry.degree.clone();
            education.start = entry.start.clone();
            education.end = entry.end.clone();
            Ok(())
        })
        .await
    }

    async fn update_education_field(
        &self,
        resume_id: Uuid,
        education_id: Uuid,
        field: EducationField,
        value: Option<String>,
    ) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            let education = resume
                .education
                .iter_mut()
                .find(|e| e.id == education_id)
                .ok_or_else(|| entry_not_found("Education entry"))?;
            match field {
                EducationField::School => education.school = value.unwrap_or_default(),
                EducationField::Degree => education.degree = value.unwrap_or_default(),
                EducationField::Start => education.start = value.unwrap_or_default(),
                EducationField::End => education.end = value,
            }
            Ok(())
        })
        .await
    }

    async fn replace_skills(&self, resume_id: Uuid, skills: &[NamedEntry]) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            resume.skills = build_skills(resume_id, skills);
            Ok(())
        })
        .await
    }

    async fn replace_work(&self, resume_id: Uuid, entries: &[WorkDraft]) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            resume.work = entries.iter().map(|w| build_work(resume_id, w)).collect();
            Ok(())
        })
        .await
    }

    async fn recreate_work(
        &self,
        resume_id: Uuid,
        work_id: Uuid,
        entry: &WorkDraft,
    ) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            let slot = resume
                .work
                .iter_mut()
                .find(|w| w.id == work_id)
                .ok_or_else(|| entry_not_found("Work entry"))?;
            *slot = build_work(resume_id, entry);
            Ok(())
        })
        .await
    }

    async fn update_work_field(
        &self,
        resume_id: Uuid,
        work_id: Uuid,
        field: WorkField,
        value: Option<String>,
    ) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            let work = resume
                .work
                .iter_mut()
                .find(|w| w.id == work_id)
                .ok_or_else(|| entry_not_found("Work entry"))?;
            match field {
                WorkField::Company => work.company = value.unwrap_or_default(),
                WorkField::Link => work.link = value,
                WorkField::Title => work.title = value.unwrap_or_default(),
                WorkField::Start => work.start = value.unwrap_or_default(),
                WorkField::End => work.end = value,
                WorkField::Description => work.description = value.unwrap_or_default(),
            }
            Ok(())
        })
        .await
    }

    async fn replace_badges(
        &self,
        resume_id: Uuid,
        work_id: Uuid,
        badges: &[NamedEntry],
    ) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            let work = resume
                .work
                .iter_mut()
                .find(|w| w.id == work_id)
                .ok_or_else(|| entry_not_found("Work entry"))?;
            work.badges = build_badges(work_id, badges);
            Ok(())
        })
        .await
    }

    async fn replace_tasks(
        &self,
        resume_id: Uuid,
        work_id: Uuid,
        tasks: &[TaskEntry],
    ) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            let work = resume
                .work
                .iter_mut()
                .find(|w| w.id == work_id)
                .ok_or_else(|| entry_not_found("Work entry"))?;
            work.tasks = build_tasks(work_id, tasks);
            Ok(())
        })
        .await
    }

    async fn replace_projects(
        &self,
        resume_id: Uuid,
        entries: &[ProjectDraft],
    ) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            resume.projects = entries
                .iter()
                .map(|p| build_project(resume_id, p))
                .collect();
            Ok(())
        })
        .await
    }

    async fn recreate_project(
        &self,
        resume_id: Uuid,
        project_id: Uuid,
        entry: &ProjectDraft,
    ) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            let slot = resume
                .projects
                .iter_mut()
                .find(|p| p.id == project_id)
                .ok_or_else(|| entry_not_found("Project"))?;
            *slot = build_project(resume_id, entry);
            Ok(())
        })
        .await
    }

    async fn update_project_field(
        &self,
        resume_id: Uuid,
        project_id: Uuid,
        field: ProjectField,
        value: Option<String>,
    ) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            let project = resume
                .projects
                .iter_mut()
                .find(|p| p.id == project_id)
                .ok_or_else(|| entry_not_found("Project"))?;
            match field {
                ProjectField::Title => project.title = value.unwrap_or_default(),
                ProjectField::Description => project.description = value,
            }
            Ok(())
        })
        .await
    }

    async fn replace_tech_stack(
        &self,
        resume_id: Uuid,
        project_id: Uuid,
        tech: &[NamedEntry],
    ) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            let project = resume
                .projects
                .iter_mut()
                .find(|p| p.id == project_id)
                .ok_or_else(|| entry_not_found("Project"))?;
            project.tech_stack = build_tech(project_id, tech);
            Ok(())
        })
        .await
    }

    async fn replace_project_link(
        &self,
        resume_id: Uuid,
        project_id: Uuid,
        link: Option<&LinkDraft>,
    ) -> Result<(), AppError> {
        self.mutate(resume_id, |resume| {
            let project = resume
                .projects
                .iter_mut()
                .find(|p| p.id == project_id)
                .ok_or_else(|| entry_not_found("Project"))?;
            project.link = link.map(|l| build_link(project_id, l));
            Ok(())
        })
        .await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// JobApplicationStore
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl JobApplicationStore for MemoryStore {
    async fn list_job_applications(&self) -> Result<Vec<JobApplication>, AppError> {
        let mut apps = self.job_applications.read().await.clone();
        apps.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let mut out = Vec::with_capacity(apps.len());
        for app in apps {
            out.push(self.with_resume_title(app).await);
        }
        Ok(out)
    }

    async fn fetch_job_application(&self, id: Uuid) -> Result<Option<JobApplication>, AppError> {
        let found = self
            .job_applications
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned();
        match found {
            Some(app) => Ok(Some(self.with_resume_title(app).await)),
            None => Ok(None),
        }
    }

    async fn create_job_application(
        &self,
        draft: &JobApplicationDraft,
    ) -> Result<JobApplication, AppError> {
        if self.fetch_resume(draft.resume_id).await?.is_none() {
            return Err(AppError::NotFound("Resume not found".to_string()));
        }
        let now = Utc::now();
        let app = JobApplication {
            id: Uuid::new_v4(),
            resume_id: draft.resume_id,
            company: draft.company.clone(),
            position: draft.position.clone(),
            status: draft.status.clone(),
            applied_date: draft.applied_date,
            job_url: draft.job_url.clone(),
            job_description: draft.job_description.clone(),
            created_at: now,
            updated_at: now,
            resume: None,
        };
        self.job_applications.write().await.push(app.clone());
        Ok(self.with_resume_title(app).await)
    }

    async fn update_job_application(
        &self,
        id: Uuid,
        patch: &JobApplicationPatch,
    ) -> Result<Option<JobApplication>, AppError> {
        if let Some(resume_id) = patch.resume_id {
            if self.fetch_resume(resume_id).await?.is_none() {
                return Err(AppError::NotFound("Resume not found".to_string()));
            }
        }
        let updated = {
            let mut apps = self.job_applications.write().await;
            let Some(app) = apps.iter_mut().find(|a| a.id == id) else {
                return Ok(None);
            };
            if let Some(resume_id) = patch.resume_id {
                app.resume_id = resume_id;
            }
            if let Some(company) = &patch.company {
                app.company = company.clone();
            }
            if let Some(position) = &patch.position {
                app.position = position.clone();
            }
            if let Some(status) = &patch.status {
                app.status = status.clone();
            }
            if let Some(applied_date) = patch.applied_date {
                app.applied_date = applied_date;
            }
            if let Some(job_url) = &patch.job_url {
                app.job_url = Some(job_url.clone());
            }
            if let Some(job_description) = &patch.job_description {
                app.job_description = Some(job_description.clone());
            }
            app.updated_at = Utc::now();
            app.clone()
        };
        Ok(Some(self.with_resume_title(updated).await))
    }

    async fn delete_job_application(&self, id: Uuid) -> Result<bool, AppError> {
        let mut apps = self.job_applications.write().await;
        let before = apps.len();
        apps.retain(|a| a.id != id);
        Ok(apps.len() != before)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// AccountStore
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl AccountStore for MemoryStore {
    async fn ensure_owner(&self, email: &str, ai_calls_limit: i32) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.iter().find(|u| u.email == email) {
            return Ok(user.clone());
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: Some("Anonymous User".to_string()),
            ai_calls_limit,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn fetch_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn consume_ai_call(&self, user_id: Uuid) -> Result<i32, AppError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.ai_calls_limit = (user.ai_calls_limit - 1).max(0);
        Ok(user.ai_calls_limit)
    }

    async fn reset_ai_calls(&self, user_id: Uuid, ai_calls_limit: i32) -> Result<i32, AppError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.ai_calls_limit = ai_calls_limit;
        Ok(user.ai_calls_limit)
    }

    async fn record_ai_response(
        &self,
        resume_id: Uuid,
        prompt: &str,
        response: &str,
    ) -> Result<(), AppError> {
        self.ai_responses.write().await.push(AiResponseRow {
            id: Uuid::new_v4(),
            resume_id,
            prompt: prompt.to_string(),
            response: response.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn record_refinement(
        &self,
        resume_id: Uuid,
        job_application_id: Uuid,
        refinements: &Value,
    ) -> Result<(), AppError> {
        self.refinements.write().await.push(AiRefinementRow {
            id: Uuid::new_v4(),
            resume_id,
            job_application_id,
            refinements: refinements.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job_application::DEFAULT_STATUS;

    fn sample_draft(owner: Uuid) -> ResumeDraft {
        ResumeDraft {
            user_id: Some(owner),
            name: "Ada Lovelace".into(),
            title: "Analyst".into(),
            summary: "Engines".into(),
            contact: Some(ContactDraft {
                email: Some("ada@example.com".into()),
                tel: None,
                social: vec![SocialDraft {
                    name: "GitHub".into(),
                    url: "https://github.com/ada".into(),
                }],
            }),
            work: vec![WorkDraft::from_value(&serde_json::json!({
                "company": "Babbage & Co",
                "title": "Programmer",
                "badges": ["Remote"],
                "tasks": ["Wrote Note G"]
            }))],
            skills: vec![NamedEntry::new("Mathematics")],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_parents() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let resume = store.create_resume(&sample_draft(owner)).await.unwrap();

        let contact = resume.contact.as_ref().unwrap();
        assert_eq!(contact.resume_id, resume.id());
        assert_eq!(contact.social[0].contact_id, contact.id);
        assert_eq!(resume.work[0].badges[0].work_id, resume.work[0].id);
        assert_eq!(resume.skills[0].resume_id, resume.id());

        let fetched = store.fetch_resume(resume.id()).await.unwrap().unwrap();
        assert_eq!(fetched, resume);
    }

    #[tokio::test]
    async fn test_recreate_work_keeps_position() {
        let store = MemoryStore::new();
        let mut draft = sample_draft(Uuid::new_v4());
        draft.work.push(WorkDraft::from_value(&serde_json::json!({"company": "Second"})));
        let resume = store.create_resume(&draft).await.unwrap();
        let first_id = resume.work[0].id;

        let replacement = WorkDraft::from_value(&serde_json::json!({"company": "Replaced"}));
        store
            .recreate_work(resume.id(), first_id, &replacement)
            .await
            .unwrap();

        let after = store.fetch_resume(resume.id()).await.unwrap().unwrap();
        assert_eq!(after.work[0].company, "Replaced");
        assert_ne!(after.work[0].id, first_id);
        assert_eq!(after.work[1].company, "Second");
        assert!(after.header.updated_at >= resume.header.updated_at);
    }

    #[tokio::test]
    async fn test_delete_resume_cascades_to_job_applications() {
        let store = MemoryStore::new();
        let resume = store
            .create_resume(&sample_draft(Uuid::new_v4()))
            .await
            .unwrap();
        let app = store
            .create_job_application(&JobApplicationDraft {
                resume_id: resume.id(),
                company: "Acme".into(),
                position: "Engineer".into(),
                status: DEFAULT_STATUS.into(),
                applied_date: Utc::now(),
                job_url: None,
                job_description: None,
            })
            .await
            .unwrap();
        assert_eq!(app.resume.as_ref().unwrap().title, "Analyst");

        assert!(store.delete_resume(resume.id()).await.unwrap());
        assert!(store.fetch_resume(resume.id()).await.unwrap().is_none());
        assert!(store.fetch_job_application(app.id).await.unwrap().is_none());
        assert!(!store.delete_resume(resume.id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_listing_is_scoped_to_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        store.create_resume(&sample_draft(owner)).await.unwrap();
        store
            .create_resume(&sample_draft(Uuid::new_v4()))
            .await
            .unwrap();
        assert_eq!(store.list_resumes(owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_quota_never_goes_negative() {
        let store = MemoryStore::new();
        let user = store.ensure_owner("a@example.com", 1).await.unwrap();
        assert_eq!(store.consume_ai_call(user.id).await.unwrap(), 0);
        assert_eq!(store.consume_ai_call(user.id).await.unwrap(), 0);
        assert_eq!(store.reset_ai_calls(user.id, 50).await.unwrap(), 50);

        let again = store.ensure_owner("a@example.com", 7).await.unwrap();
        assert_eq!(again.id, user.id);
        assert_eq!(again.ai_calls_limit, 50);
    }
}

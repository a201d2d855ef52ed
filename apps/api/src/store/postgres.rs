//! PostgreSQL backend.
//!
//! Children are ordered by their `seq` identity column, which follows insertion order.
//! Recreating a single work entry or project reuses the deleted row's `seq`, so the
//! entry keeps its position. Every multi-statement write runs in one transaction and
//! bumps `resumes.updated_at`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job_application::{
    JobApplication, JobApplicationDraft, JobApplicationPatch, JobApplicationRow,
};
use crate::models::resume::{
    Badge, Contact, Education, Project, ProjectLink, Resume, ResumeHeader, ResumeListing, Skill,
    Social, Task, TechTag, Work,
};
use crate::models::user::User;
use crate::resume::drafts::{
    ContactDraft, EducationDraft, LinkDraft, ProjectDraft, ResumeDraft, SocialDraft, WorkDraft,
};
use crate::resume::normalize::{NamedEntry, TaskEntry};
use crate::resume::path::{EducationField, ProjectField, ResumeField, SocialField, WorkField};

use super::{AccountStore, ContactUpdate, DocumentUpdate, JobApplicationStore, ResumeStore};

const RESUME_COLUMNS: &str = "id, user_id, name, title, initials, location, location_link, about, \
     summary, avatar_url, personal_website_url, created_at, updated_at";

const JOB_APPLICATION_SELECT: &str = r#"
    SELECT ja.id, ja.resume_id, ja.company, ja.position, ja.status, ja.applied_date,
           ja.job_url, ja.job_description, ja.created_at, ja.updated_at,
           r.title AS resume_title
    FROM job_applications ja
    LEFT JOIN resumes r ON r.id = ja.resume_id
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Snapshot loading
// ────────────────────────────────────────────────────────────────────────────

async fn load_contacts(
    conn: &mut PgConnection,
    resume_ids: &[Uuid],
) -> Result<HashMap<Uuid, Contact>, sqlx::Error> {
    let mut contacts = sqlx::query_as::<_, Contact>(
        "SELECT id, resume_id, email, tel FROM contacts WHERE resume_id = ANY($1)",
    )
    .bind(resume_ids)
    .fetch_all(&mut *conn)
    .await?;

    let contact_ids: Vec<Uuid> = contacts.iter().map(|c| c.id).collect();
    let socials = sqlx::query_as::<_, Social>(
        "SELECT id, contact_id, name, url FROM socials WHERE contact_id = ANY($1) ORDER BY seq",
    )
    .bind(&contact_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_contact: HashMap<Uuid, Vec<Social>> = HashMap::new();
    for social in socials {
        by_contact.entry(social.contact_id).or_default().push(social);
    }
    for contact in &mut contacts {
        contact.social = by_contact.remove(&contact.id).unwrap_or_default();
    }

    Ok(contacts.into_iter().map(|c| (c.resume_id, c)).collect())
}

async fn load_work(conn: &mut PgConnection, resume_id: Uuid) -> Result<Vec<Work>, sqlx::Error> {
    let mut work = sqlx::query_as::<_, Work>(
        r#"
        SELECT id, resume_id, company, link, title, start_date AS start, end_date AS "end",
               description
        FROM work WHERE resume_id = $1 ORDER BY seq
        "#,
    )
    .bind(resume_id)
    .fetch_all(&mut *conn)
    .await?;

    let work_ids: Vec<Uuid> = work.iter().map(|w| w.id).collect();
    let badges = sqlx::query_as::<_, Badge>(
        "SELECT id, work_id, name FROM work_badges WHERE work_id = ANY($1) ORDER BY seq",
    )
    .bind(&work_ids)
    .fetch_all(&mut *conn)
    .await?;
    let tasks = sqlx::query_as::<_, Task>(
        "SELECT id, work_id, description FROM work_tasks WHERE work_id = ANY($1) ORDER BY seq",
    )
    .bind(&work_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut badges_by_work: HashMap<Uuid, Vec<Badge>> = HashMap::new();
    for badge in badges {
        badges_by_work.entry(badge.work_id).or_default().push(badge);
    }
    let mut tasks_by_work: HashMap<Uuid, Vec<Task>> = HashMap::new();
    for task in tasks {
        tasks_by_work.entry(task.work_id).or_default().push(task);
    }
    for entry in &mut work {
        entry.badges = badges_by_work.remove(&entry.id).unwrap_or_default();
        entry.tasks = tasks_by_work.remove(&entry.id).unwrap_or_default();
    }
    Ok(work)
}

async fn load_projects(
    conn: &mut PgConnection,
    resume_id: Uuid,
) -> Result<Vec<Project>, sqlx::Error> {
    let mut projects = sqlx::query_as::<_, Project>(
        "SELECT id, resume_id, title, description FROM projects WHERE resume_id = $1 ORDER BY seq",
    )
    .bind(resume_id)
    .fetch_all(&mut *conn)
    .await?;

    let project_ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
    let tech = sqlx::query_as::<_, TechTag>(
        "SELECT id, project_id, name FROM project_tech WHERE project_id = ANY($1) ORDER BY seq",
    )
    .bind(&project_ids)
    .fetch_all(&mut *conn)
    .await?;
    let links = sqlx::query_as::<_, ProjectLink>(
        "SELECT id, project_id, label, href FROM project_links WHERE project_id = ANY($1)",
    )
    .bind(&project_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut tech_by_project: HashMap<Uuid, Vec<TechTag>> = HashMap::new();
    for tag in tech {
        tech_by_project.entry(tag.project_id).or_default().push(tag);
    }
    let mut link_by_project: HashMap<Uuid, ProjectLink> =
        links.into_iter().map(|l| (l.project_id, l)).collect();
    for project in &mut projects {
        project.tech_stack = tech_by_project.remove(&project.id).unwrap_or_default();
        project.link = link_by_project.remove(&project.id);
    }
    Ok(projects)
}

async fn load_resume(conn: &mut PgConnection, id: Uuid) -> Result<Option<Resume>, sqlx::Error> {
    let header = sqlx::query_as::<_, ResumeHeader>(&format!(
        "SELECT {RESUME_COLUMNS} FROM resumes WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(header) = header else {
        return Ok(None);
    };

    let contact = load_contacts(conn, &[id]).await?.remove(&id);
    let education = sqlx::query_as::<_, Education>(
        r#"
        SELECT id, resume_id, school, degree, start_date AS start, end_date AS "end"
        FROM education WHERE resume_id = $1 ORDER BY seq
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    let work = load_work(conn, id).await?;
    let skills = sqlx::query_as::<_, Skill>(
        "SELECT id, resume_id, name FROM skills WHERE resume_id = $1 ORDER BY seq",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    let projects = load_projects(conn, id).await?;

    Ok(Some(Resume {
        header,
        contact,
        education,
        work,
        skills,
        projects,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Inserts (always called inside a transaction)
// ────────────────────────────────────────────────────────────────────────────

async fn insert_socials(
    conn: &mut PgConnection,
    contact_id: Uuid,
    social: &[SocialDraft],
) -> Result<(), sqlx::Error> {
    for s in social {
        sqlx::query("INSERT INTO socials (id, contact_id, name, url) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(contact_id)
            .bind(&s.name)
            .bind(&s.url)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_contact(
    conn: &mut PgConnection,
    resume_id: Uuid,
    contact: &ContactDraft,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO contacts (id, resume_id, email, tel) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(resume_id)
        .bind(&contact.email)
        .bind(&contact.tel)
        .execute(&mut *conn)
        .await?;
    insert_socials(conn, id, &contact.social).await?;
    Ok(id)
}

async fn insert_education(
    conn: &mut PgConnection,
    resume_id: Uuid,
    entries: &[EducationDraft],
) -> Result<(), sqlx::Error> {
    for e in entries {
        sqlx::query(
            r#"
            INSERT INTO education (id, resume_id, school, degree, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(resume_id)
        .bind(&e.school)
        .bind(&e.degree)
        .bind(&e.start)
        .bind(&e.end)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_badges(
    conn: &mut PgConnection,
    work_id: Uuid,
    badges: &[NamedEntry],
) -> Result<(), sqlx::Error> {
    for b in badges {
        sqlx::query("INSERT INTO work_badges (id, work_id, name) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(work_id)
            .bind(&b.name)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_tasks(
    conn: &mut PgConnection,
    work_id: Uuid,
    tasks: &[TaskEntry],
) -> Result<(), sqlx::Error> {
    for t in tasks {
        sqlx::query("INSERT INTO work_tasks (id, work_id, description) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(work_id)
            .bind(&t.description)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Inserts one work entry with its badges and tasks. `seq` pins the position when
/// an existing entry is being recreated.
async fn insert_work(
    conn: &mut PgConnection,
    resume_id: Uuid,
    entry: &WorkDraft,
    seq: Option<i64>,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO work (id, seq, resume_id, company, link, title, start_date, end_date, description)
        VALUES ($1, COALESCE($2, nextval(pg_get_serial_sequence('work', 'seq'))),
                $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(id)
    .bind(seq)
    .bind(resume_id)
    .bind(&entry.company)
    .bind(&entry.link)
    .bind(&entry.title)
    .bind(&entry.start)
    .bind(&entry.end)
    .bind(&entry.description)
    .execute(&mut *conn)
    .await?;
    insert_badges(conn, id, &entry.badges).await?;
    insert_tasks(conn, id, &entry.tasks).await?;
    Ok(id)
}

async fn insert_skills(
    conn: &mut PgConnection,
    resume_id: Uuid,
    skills: &[NamedEntry],
) -> Result<(), sqlx::Error> {
    for s in skills {
        sqlx::query("INSERT INTO skills (id, resume_id, name) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(resume_id)
            .bind(&s.name)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_tech(
    conn: &mut PgConnection,
    project_id: Uuid,
    tech: &[NamedEntry],
) -> Result<(), sqlx::Error> {
    for t in tech {
        sqlx::query("INSERT INTO project_tech (id, project_id, name) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(&t.name)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_link(
    conn: &mut PgConnection,
    project_id: Uuid,
    link: &LinkDraft,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO project_links (id, project_id, label, href) VALUES ($1, $2, $3, $4)")
        .bind(Uuid::new_v4())
        .bind(project_id)
        .bind(&link.label)
        .bind(&link.href)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn insert_project(
    conn: &mut PgConnection,
    resume_id: Uuid,
    entry: &ProjectDraft,
    seq: Option<i64>,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO projects (id, seq, resume_id, title, description)
        VALUES ($1, COALESCE($2, nextval(pg_get_serial_sequence('projects', 'seq'))), $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(seq)
    .bind(resume_id)
    .bind(&entry.title)
    .bind(&entry.description)
    .execute(&mut *conn)
    .await?;
    insert_tech(conn, id, &entry.tech_stack).await?;
    if let Some(link) = &entry.link {
        insert_link(conn, id, link).await?;
    }
    Ok(id)
}

// ────────────────────────────────────────────────────────────────────────────
// Guards
// ────────────────────────────────────────────────────────────────────────────

/// Bumps `updated_at`; fails with `NotFound` when the resume does not exist.
async fn touch(conn: &mut PgConnection, resume_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE resumes SET updated_at = now() WHERE id = $1")
        .bind(resume_id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Resume not found".to_string()));
    }
    Ok(())
}

async fn ensure_work(conn: &mut PgConnection, resume_id: Uuid, work_id: Uuid) -> Result<(), AppError> {
    let found: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM work WHERE id = $1 AND resume_id = $2")
            .bind(work_id)
            .bind(resume_id)
            .fetch_optional(&mut *conn)
            .await?;
    found
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("Work entry not found".to_string()))
}

async fn ensure_project(
    conn: &mut PgConnection,
    resume_id: Uuid,
    project_id: Uuid,
) -> Result<(), AppError> {
    let found: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM projects WHERE id = $1 AND resume_id = $2")
            .bind(project_id)
            .bind(resume_id)
            .fetch_optional(&mut *conn)
            .await?;
    found
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
}

/// Updates contact scalars and optionally the social links, creating the contact row
/// when the resume has none.
async fn write_contact(
    conn: &mut PgConnection,
    resume_id: Uuid,
    update: &ContactUpdate,
) -> Result<(), AppError> {
    let existing: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM contacts WHERE resume_id = $1")
            .bind(resume_id)
            .fetch_optional(&mut *conn)
            .await?;

    let contact_id = match existing {
        Some(contact_id) => {
            sqlx::query(
                r#"
                UPDATE contacts
                SET email = CASE WHEN $2 THEN $3 ELSE email END,
                    tel = CASE WHEN $4 THEN $5 ELSE tel END
                WHERE id = $1
                "#,
            )
            .bind(contact_id)
            .bind(update.email.is_some())
            .bind(update.email.clone().flatten())
            .bind(update.tel.is_some())
            .bind(update.tel.clone().flatten())
            .execute(&mut *conn)
            .await?;
            contact_id
        }
        None => {
            let draft = ContactDraft {
                email: update.email.clone().flatten(),
                tel: update.tel.clone().flatten(),
                social: Vec::new(),
            };
            insert_contact(conn, resume_id, &draft).await?
        }
    };

    if let Some(social) = &update.social {
        sqlx::query("DELETE FROM socials WHERE contact_id = $1")
            .bind(contact_id)
            .execute(&mut *conn)
            .await?;
        insert_socials(conn, contact_id, social).await?;
    }
    Ok(())
}

async fn write_scalars(
    conn: &mut PgConnection,
    id: Uuid,
    updates: &[(ResumeField, Option<String>)],
) -> Result<(), AppError> {
    // Columns come from a closed enum, never from request text.
    let assignments: Vec<String> = updates
        .iter()
        .enumerate()
        .map(|(i, (field, _))| format!("{} = ${}", field.column(), i + 2))
        .chain(std::iter::once("updated_at = now()".to_string()))
        .collect();
    let sql = format!("UPDATE resumes SET {} WHERE id = $1", assignments.join(", "));

    let mut query = sqlx::query(&sql).bind(id);
    for (_, value) in updates {
        query = query.bind(value);
    }
    let result = query.execute(&mut *conn).await?;
    require_row(result.rows_affected(), "Resume")
}

/// `table` is always one of the fixed child table names.
async fn clear_children(
    conn: &mut PgConnection,
    table: &'static str,
    resume_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("DELETE FROM {table} WHERE resume_id = $1"))
        .bind(resume_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

fn require_row(rows_affected: u64, what: &str) -> Result<(), AppError> {
    if rows_affected == 0 {
        return Err(AppError::NotFound(format!("{what} not found")));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// ResumeStore
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ResumeStore for PgStore {
    async fn fetch_resume(&self, id: Uuid) -> Result<Option<Resume>, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(load_resume(&mut conn, id).await?)
    }

    async fn list_resumes(&self, owner_id: Uuid) -> Result<Vec<ResumeListing>, AppError> {
        let mut conn = self.pool.acquire().await?;
        let headers = sqlx::query_as::<_, ResumeHeader>(&format!(
            "SELECT {RESUME_COLUMNS} FROM resumes WHERE user_id = $1 ORDER BY updated_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&mut *conn)
        .await?;

        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let mut contacts = load_contacts(&mut conn, &ids).await?;
        Ok(headers
            .into_iter()
            .map(|header| ResumeListing {
                contact: contacts.remove(&header.id),
                header,
            })
            .collect())
    }

    async fn latest_resume(&self, owner_id: Uuid) -> Result<Option<Resume>, AppError> {
        let mut conn = self.pool.acquire().await?;
        let id: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM resumes WHERE user_id = $1 ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(owner_id)
        .fetch_optional(&mut *conn)
        .await?;
        match id {
            Some(id) => Ok(load_resume(&mut conn, id).await?),
            None => Ok(None),
        }
    }

    async fn create_resume(&self, draft: &ResumeDraft) -> Result<Resume, AppError> {
        let mut tx = self.pool.begin().await?;
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO resumes
                (id, user_id, name, title, initials, location, location_link, about,
                 summary, avatar_url, personal_website_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(id)
        .bind(draft.user_id)
        .bind(&draft.name)
        .bind(&draft.title)
        .bind(&draft.initials)
        .bind(&draft.location)
        .bind(&draft.location_link)
        .bind(&draft.about)
        .bind(&draft.summary)
        .bind(&draft.avatar_url)
        .bind(&draft.personal_website_url)
        .execute(&mut *tx)
        .await?;

        if let Some(contact) = &draft.contact {
            insert_contact(&mut tx, id, contact).await?;
        }
        insert_education(&mut tx, id, &draft.education).await?;
        for entry in &draft.work {
            insert_work(&mut tx, id, entry, None).await?;
        }
        insert_skills(&mut tx, id, &draft.skills).await?;
        for entry in &draft.projects {
            insert_project(&mut tx, id, entry, None).await?;
        }

        let resume = load_resume(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Resume {id} vanished after insert")))?;
        tx.commit().await?;

        info!("Created resume {id}");
        Ok(resume)
    }

    async fn delete_resume(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_scalars(
        &self,
        id: Uuid,
        updates: &[(ResumeField, Option<String>)],
    ) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        write_scalars(&mut conn, id, updates).await
    }

    async fn apply_document(&self, resume_id: Uuid, update: &DocumentUpdate) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;

        if !update.scalars.is_empty() {
            write_scalars(&mut tx, resume_id, &update.scalars).await?;
        }
        if let Some(contact) = &update.contact {
            write_contact(&mut tx, resume_id, contact).await?;
        }
        if let Some(entries) = &update.education {
            clear_children(&mut tx, "education", resume_id).await?;
            insert_education(&mut tx, resume_id, entries).await?;
        }
        if let Some(entries) = &update.work {
            clear_children(&mut tx, "work", resume_id).await?;
            for entry in entries {
                insert_work(&mut tx, resume_id, entry, None).await?;
            }
        }
        if let Some(skills) = &update.skills {
            clear_children(&mut tx, "skills", resume_id).await?;
            insert_skills(&mut tx, resume_id, skills).await?;
        }
        if let Some(entries) = &update.projects {
            clear_children(&mut tx, "projects", resume_id).await?;
            for entry in entries {
                insert_project(&mut tx, resume_id, entry, None).await?;
            }
        }

        tx.commit().await?;
        debug!("Applied document update to resume {resume_id}");
        Ok(())
    }

    async fn update_contact(&self, resume_id: Uuid, update: &ContactUpdate) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        write_contact(&mut tx, resume_id, update).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_social_field(
        &self,
        resume_id: Uuid,
        social_id: Uuid,
        field: SocialField,
        value: String,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        let result = sqlx::query(&format!(
            "UPDATE socials SET {} = $1 WHERE id = $2 \
             AND contact_id IN (SELECT id FROM contacts WHERE resume_id = $3)",
            field.column()
        ))
        .bind(value)
        .bind(social_id)
        .bind(resume_id)
        .execute(&mut *tx)
        .await?;
        require_row(result.rows_affected(), "Social link")?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_education(
        &self,
        resume_id: Uuid,
        entries: &[EducationDraft],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        clear_children(&mut tx, "education", resume_id).await?;
        insert_education(&mut tx, resume_id, entries).await?;
        tx.commit().await?;
        debug!("Replaced education of {resume_id} with {} entries", entries.len());
        Ok(())
    }

    async fn update_education(
        &self,
        resume_id: Uuid,
        education_id: Uuid,
        entry: &EducationDraft,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        let result = sqlx::query(
            r#"
            UPDATE education SET school = $1, degree = $2, start_date = $3, end_date = $4
            WHERE id = $5 AND resume_id = $6
            "#,
        )
        .bind(&entry.school)
        .bind(&entry.degree)
        .bind(&entry.start)
        .bind(&entry.end)
        .bind(education_id)
        .bind(resume_id)
        .execute(&mut *tx)
        .await?;
        require_row(result.rows_affected(), "Education entry")?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_education_field(
        &self,
        resume_id: Uuid,
        education_id: Uuid,
        field: EducationField,
        value: Option<String>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        let result = sqlx::query(&format!(
            "UPDATE education SET {} = $1 WHERE id = $2 AND resume_id = $3",
            field.column()
        ))
        .bind(value)
        .bind(education_id)
        .bind(resume_id)
        .execute(&mut *tx)
        .await?;
        require_row(result.rows_affected(), "Education entry")?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_skills(&self, resume_id: Uuid, skills: &[NamedEntry]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        clear_children(&mut tx, "skills", resume_id).await?;
        insert_skills(&mut tx, resume_id, skills).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_work(&self, resume_id: Uuid, entries: &[WorkDraft]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        clear_children(&mut tx, "work", resume_id).await?;
        for entry in entries {
            insert_work(&mut tx, resume_id, entry, None).await?;
        }
        tx.commit().await?;
        debug!("Replaced work of {resume_id} with {} entries", entries.len());
        Ok(())
    }

    async fn recreate_work(
        &self,
        resume_id: Uuid,
        work_id: Uuid,
        entry: &WorkDraft,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        let seq: Option<i64> =
            sqlx::query_scalar("DELETE FROM work WHERE id = $1 AND resume_id = $2 RETURNING seq")
                .bind(work_id)
                .bind(resume_id)
                .fetch_optional(&mut *tx)
                .await?;
        let seq = seq.ok_or_else(|| AppError::NotFound("Work entry not found".to_string()))?;
        insert_work(&mut tx, resume_id, entry, Some(seq)).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_work_field(
        &self,
        resume_id: Uuid,
        work_id: Uuid,
        field: WorkField,
        value: Option<String>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        let result = sqlx::query(&format!(
            "UPDATE work SET {} = $1 WHERE id = $2 AND resume_id = $3",
            field.column()
        ))
        .bind(value)
        .bind(work_id)
        .bind(resume_id)
        .execute(&mut *tx)
        .await?;
        require_row(result.rows_affected(), "Work entry")?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_badges(
        &self,
        resume_id: Uuid,
        work_id: Uuid,
        badges: &[NamedEntry],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        ensure_work(&mut tx, resume_id, work_id).await?;
        sqlx::query("DELETE FROM work_badges WHERE work_id = $1")
            .bind(work_id)
            .execute(&mut *tx)
            .await?;
        insert_badges(&mut tx, work_id, badges).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_tasks(
        &self,
        resume_id: Uuid,
        work_id: Uuid,
        tasks: &[TaskEntry],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        ensure_work(&mut tx, resume_id, work_id).await?;
        sqlx::query("DELETE FROM work_tasks WHERE work_id = $1")
            .bind(work_id)
            .execute(&mut *tx)
            .await?;
        insert_tasks(&mut tx, work_id, tasks).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_projects(
        &self,
        resume_id: Uuid,
        entries: &[ProjectDraft],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        clear_children(&mut tx, "projects", resume_id).await?;
        for entry in entries {
            insert_project(&mut tx, resume_id, entry, None).await?;
        }
        tx.commit().await?;
        debug!("Replaced projects of {resume_id} with {} entries", entries.len());
        Ok(())
    }

    async fn recreate_project(
        &self,
        resume_id: Uuid,
        project_id: Uuid,
        entry: &ProjectDraft,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        let seq: Option<i64> = sqlx::query_scalar(
            "DELETE FROM projects WHERE id = $1 AND resume_id = $2 RETURNING seq",
        )
        .bind(project_id)
        .bind(resume_id)
        .fetch_optional(&mut *tx)
        .await?;
        let seq = seq.ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
        insert_project(&mut tx, resume_id, entry, Some(seq)).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_project_field(
        &self,
        resume_id: Uuid,
        project_id: Uuid,
        field: ProjectField,
        value: Option<String>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        let result = sqlx::query(&format!(
            "UPDATE projects SET {} = $1 WHERE id = $2 AND resume_id = $3",
            field.column()
        ))
        .bind(value)
        .bind(project_id)
        .bind(resume_id)
        .execute(&mut *tx)
        .await?;
        require_row(result.rows_affected(), "Project")?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_tech_stack(
        &self,
        resume_id: Uuid,
        project_id: Uuid,
        tech: &[NamedEntry],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        ensure_project(&mut tx, resume_id, project_id).await?;
        sqlx::query("DELETE FROM project_tech WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        insert_tech(&mut tx, project_id, tech).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_project_link(
        &self,
        resume_id: Uuid,
        project_id: Uuid,
        link: Option<&LinkDraft>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, resume_id).await?;
        ensure_project(&mut tx, resume_id, project_id).await?;
        sqlx::query("DELETE FROM project_links WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        if let Some(link) = link {
            insert_link(&mut tx, project_id, link).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// JobApplicationStore
// ────────────────────────────────────────────────────────────────────────────

async fn resume_exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM resumes WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

#[async_trait]
impl JobApplicationStore for PgStore {
    async fn list_job_applications(&self) -> Result<Vec<JobApplication>, AppError> {
        let rows = sqlx::query_as::<_, JobApplicationRow>(&format!(
            "{JOB_APPLICATION_SELECT} ORDER BY ja.updated_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(JobApplication::from).collect())
    }

    async fn fetch_job_application(&self, id: Uuid) -> Result<Option<JobApplication>, AppError> {
        let row = sqlx::query_as::<_, JobApplicationRow>(&format!(
            "{JOB_APPLICATION_SELECT} WHERE ja.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(JobApplication::from))
    }

    async fn create_job_application(
        &self,
        draft: &JobApplicationDraft,
    ) -> Result<JobApplication, AppError> {
        if !resume_exists(&self.pool, draft.resume_id).await? {
            return Err(AppError::NotFound("Resume not found".to_string()));
        }
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO job_applications
                (id, resume_id, company, position, status, applied_date, job_url, job_description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(draft.resume_id)
        .bind(&draft.company)
        .bind(&draft.position)
        .bind(&draft.status)
        .bind(draft.applied_date)
        .bind(&draft.job_url)
        .bind(&draft.job_description)
        .execute(&self.pool)
        .await?;

        self.fetch_job_application(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Job application {id} vanished")))
    }

    async fn update_job_application(
        &self,
        id: Uuid,
        patch: &JobApplicationPatch,
    ) -> Result<Option<JobApplication>, AppError> {
        if let Some(resume_id) = patch.resume_id {
            if !resume_exists(&self.pool, resume_id).await? {
                return Err(AppError::NotFound("Resume not found".to_string()));
            }
        }
        let result = sqlx::query(
            r#"
            UPDATE job_applications SET
                resume_id = COALESCE($2, resume_id),
                company = COALESCE($3, company),
                position = COALESCE($4, position),
                status = COALESCE($5, status),
                applied_date = COALESCE($6, applied_date),
                job_url = COALESCE($7, job_url),
                job_description = COALESCE($8, job_description),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.resume_id)
        .bind(&patch.company)
        .bind(&patch.position)
        .bind(&patch.status)
        .bind(patch.applied_date)
        .bind(&patch.job_url)
        .bind(&patch.job_description)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_job_application(id).await
    }

    async fn delete_job_application(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM job_applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// AccountStore
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl AccountStore for PgStore {
    async fn ensure_owner(&self, email: &str, ai_calls_limit: i32) -> Result<User, AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, ai_calls_limit)
            VALUES ($1, $2, 'Anonymous User', $3)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(ai_calls_limit)
        .execute(&self.pool)
        .await?;

        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, ai_calls_limit, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn fetch_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, ai_calls_limit, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn consume_ai_call(&self, user_id: Uuid) -> Result<i32, AppError> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE users SET ai_calls_limit = GREATEST(ai_calls_limit - 1, 0)
            WHERE id = $1
            RETURNING ai_calls_limit
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        remaining.ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn reset_ai_calls(&self, user_id: Uuid, ai_calls_limit: i32) -> Result<i32, AppError> {
        let remaining: Option<i32> = sqlx::query_scalar(
            "UPDATE users SET ai_calls_limit = $2 WHERE id = $1 RETURNING ai_calls_limit",
        )
        .bind(user_id)
        .bind(ai_calls_limit)
        .fetch_optional(&self.pool)
        .await?;
        remaining.ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn record_ai_response(
        &self,
        resume_id: Uuid,
        prompt: &str,
        response: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO ai_responses (id, resume_id, prompt, response) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(resume_id)
        .bind(prompt)
        .bind(response)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_refinement(
        &self,
        resume_id: Uuid,
        job_application_id: Uuid,
        refinements: &Value,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO ai_refinements (id, resume_id, job_application_id, refinements)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(resume_id)
        .bind(job_application_id)
        .bind(refinements)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

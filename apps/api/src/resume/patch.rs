//! Path resolver: applies "set `value` at `path`" to a stored resume.
//!
//! The path is parsed into a [`FieldPath`] first, then the resume snapshot is fetched and
//! any positional segment is resolved to the id of the entry currently at that position.
//! Bounds are checked before anything is written, so a rejected patch leaves the resume
//! untouched. Whole-collection and whole-entry writes are delete-and-recreate; scalar
//! writes touch one column.

use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::Resume;
use crate::resume::drafts::{
    description_text, EducationDraft, LinkDraft, ProjectDraft, SocialDraft, WorkDraft,
};
use crate::resume::normalize::{normalize_names, normalize_tasks};
use crate::resume::path::{ContactField, FieldPath, ProjectField, ResumeField, WorkField};
use crate::store::{ContactUpdate, DocumentUpdate, ResumeStore};

/// Applies `value` at `segments` and returns the resume as stored afterwards.
pub async fn apply_patch<S: ResumeStore + ?Sized>(
    store: &S,
    resume_id: Uuid,
    segments: &[String],
    value: &Value,
) -> Result<Resume, AppError> {
    let path = FieldPath::parse(segments)?;
    let snapshot = store
        .fetch_resume(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))?;

    let label = if segments.is_empty() {
        "resume".to_string()
    } else {
        segments.join(".")
    };
    apply_path(store, &snapshot, path, value, &label).await?;
    debug!("Applied patch at '{label}' to resume {resume_id}");

    store
        .fetch_resume(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))
}

async fn apply_path<S: ResumeStore + ?Sized>(
    store: &S,
    snapshot: &Resume,
    path: FieldPath,
    value: &Value,
    label: &str,
) -> Result<(), AppError> {
    let resume_id = snapshot.id();

    match path {
        FieldPath::Document => {
            let update = document_update(expect_object(value, label)?)?;
            if update.is_empty() {
                return Ok(());
            }
            store.apply_document(resume_id, &update).await
        }

        FieldPath::Scalar(field) => {
            let text = scalar_text(value, field.nullable(), label)?;
            store.update_scalars(resume_id, &[(field, text)]).await
        }

        FieldPath::Contact => {
            let object = expect_object(value, label)?;
            store
                .update_contact(resume_id, &contact_update_from(object))
                .await
        }
        FieldPath::ContactField(field) => {
            let text = scalar_text(value, true, label)?;
            store
                .update_contact(resume_id, &ContactUpdate::field(field, text))
                .await
        }
        FieldPath::Socials => {
            let list = SocialDraft::list_from_value(expect_array(value, label)?);
            store
                .update_contact(resume_id, &ContactUpdate::socials(list))
                .await
        }
        FieldPath::SocialField { index, field } => {
            let socials = snapshot
                .contact
                .as_ref()
                .map(|c| c.social.as_slice())
                .unwrap_or(&[]);
            let social = at_position(socials, index, "social")?;
            let text = scalar_text(value, false, label)?.unwrap_or_default();
            store
                .update_social_field(resume_id, social.id, field, text)
                .await
        }

        FieldPath::Education => {
            let list = EducationDraft::list_from_value(expect_array(value, label)?);
            store.replace_education(resume_id, &list).await
        }
        FieldPath::EducationEntry(index) => {
            let existing = at_position(&snapshot.education, index, "education")?;
            let patch = expect_object(value, label)?;
            let base = serde_json::json!({
                "school": existing.school,
                "degree": existing.degree,
                "start": existing.start,
                "end": existing.end,
            });
            let draft = EducationDraft::from_value(&overlay(base, patch));
            store.update_education(resume_id, existing.id, &draft).await
        }
        FieldPath::EducationField { index, field } => {
            let existing = at_position(&snapshot.education, index, "education")?;
            let text = scalar_text(value, field.nullable(), label)?;
            store
                .update_education_field(resume_id, existing.id, field, text)
                .await
        }

        FieldPath::Skills => {
            let skills = normalize_names(expect_array(value, label)?);
            store.replace_skills(resume_id, &skills).await
        }

        FieldPath::Work => {
            let list = WorkDraft::list_from_value(expect_array(value, label)?);
            store.replace_work(resume_id, &list).await
        }
        FieldPath::WorkEntry(index) => {
            let existing = at_position(&snapshot.work, index, "work")?;
            let draft = WorkDraft::from_value(expect_object_value(value, label)?);
            store.recreate_work(resume_id, existing.id, &draft).await
        }
        FieldPath::WorkField { index, field } => {
            let existing = at_position(&snapshot.work, index, "work")?;
            let text = match field {
                WorkField::Description => {
                    reject_null(value, label)?;
                    Some(description_text(Some(value)))
                }
                _ => scalar_text(value, field.nullable(), label)?,
            };
            store
                .update_work_field(resume_id, existing.id, field, text)
                .await
        }
        FieldPath::WorkBadges(index) => {
            let existing = at_position(&snapshot.work, index, "work")?;
            let badges = normalize_names(expect_array(value, label)?);
            store.replace_badges(resume_id, existing.id, &badges).await
        }
        FieldPath::WorkTasks(index) => {
            let existing = at_position(&snapshot.work, index, "work")?;
            let tasks = normalize_tasks(expect_array(value, label)?);
            store.replace_tasks(resume_id, existing.id, &tasks).await
        }

        FieldPath::Projects => {
            let list = ProjectDraft::list_from_value(expect_array(value, label)?);
            store.replace_projects(resume_id, &list).await
        }
        FieldPath::ProjectEntry(index) => {
            let existing = at_position(&snapshot.projects, index, "projects")?;
            let draft = ProjectDraft::from_value(expect_object_value(value, label)?);
            store.recreate_project(resume_id, existing.id, &draft).await
        }
        FieldPath::ProjectField { index, field } => {
            let existing = at_position(&snapshot.projects, index, "projects")?;
            let text = match field {
                ProjectField::Description if !value.is_null() => {
                    Some(description_text(Some(value)))
                }
                _ => scalar_text(value, field.nullable(), label)?,
            };
            store
                .update_project_field(resume_id, existing.id, field, text)
                .await
        }
        FieldPath::ProjectTechStack(index) => {
            let existing = at_position(&snapshot.projects, index, "projects")?;
            let tech = normalize_names(expect_array(value, label)?);
            store.replace_tech_stack(resume_id, existing.id, &tech).await
        }
        FieldPath::ProjectLink(index) => {
            let existing = at_position(&snapshot.projects, index, "projects")?;
            let link = LinkDraft::from_value(value);
            store
                .replace_project_link(resume_id, existing.id, link.as_ref())
                .await
        }
    }
}

/// `[]` with an object: every known top-level field that is present and non-null is
/// decoded and checked first, then all of them are written together. Everything else
/// is left as it was.
fn document_update(object: &Map<String, Value>) -> Result<DocumentUpdate, AppError> {
    let mut update = DocumentUpdate::default();
    for field in ResumeField::ALL {
        if let Some(value) = present(object, field.key()) {
            update
                .scalars
                .push((*field, scalar_text(value, field.nullable(), field.key())?));
        }
    }
    if let Some(contact) = present(object, "contact") {
        update.contact = Some(contact_update_from(expect_object(contact, "contact")?));
    }
    if let Some(education) = present(object, "education") {
        update.education = Some(EducationDraft::list_from_value(expect_array(
            education,
            "education",
        )?));
    }
    if let Some(work) = present(object, "work") {
        update.work = Some(WorkDraft::list_from_value(expect_array(work, "work")?));
    }
    if let Some(skills) = present(object, "skills") {
        update.skills = Some(normalize_names(expect_array(skills, "skills")?));
    }
    if let Some(projects) = present(object, "projects") {
        update.projects = Some(ProjectDraft::list_from_value(expect_array(
            projects, "projects",
        )?));
    }
    Ok(update)
}

/// Contact object semantics: empty or missing email/tel keep the stored value,
/// an array under `social` replaces the whole collection.
fn contact_update_from(object: &Map<String, Value>) -> ContactUpdate {
    let non_empty = |field: ContactField| {
        object
            .get(field.key())
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(|s| Some(s.to_string()))
    };
    ContactUpdate {
        email: non_empty(ContactField::Email),
        tel: non_empty(ContactField::Tel),
        social: object
            .get("social")
            .filter(|v| v.is_array())
            .map(SocialDraft::list_from_value),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Value checks
// ────────────────────────────────────────────────────────────────────────────

fn present<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|v| !v.is_null())
}

fn at_position<'a, T>(items: &'a [T], index: usize, collection: &'static str) -> Result<&'a T, AppError> {
    items.get(index).ok_or(AppError::IndexOutOfBounds {
        collection,
        index,
        len: items.len(),
    })
}

fn expect_object<'a>(value: &'a Value, label: &str) -> Result<&'a Map<String, Value>, AppError> {
    value
        .as_object()
        .ok_or_else(|| AppError::Validation(format!("'{label}' expects an object")))
}

fn expect_object_value<'a>(value: &'a Value, label: &str) -> Result<&'a Value, AppError> {
    expect_object(value, label).map(|_| value)
}

fn expect_array<'a>(value: &'a Value, label: &str) -> Result<&'a Value, AppError> {
    if value.is_array() {
        Ok(value)
    } else {
        Err(AppError::Validation(format!("'{label}' expects an array")))
    }
}

fn reject_null(value: &Value, label: &str) -> Result<(), AppError> {
    if value.is_null() {
        return Err(AppError::Validation(format!("'{label}' cannot be null")));
    }
    Ok(())
}

/// Text for a scalar column. Numbers and booleans are stringified; containers are rejected.
fn scalar_text(value: &Value, nullable: bool, label: &str) -> Result<Option<String>, AppError> {
    match value {
        Value::Null if nullable => Ok(None),
        Value::Null => Err(AppError::Validation(format!("'{label}' cannot be null"))),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(AppError::Validation(format!(
            "'{label}' expects a text value"
        ))),
    }
}

/// Shallow merge: keys present in `patch` replace those in `base`.
fn overlay(mut base: Value, patch: &Map<String, Value>) -> Value {
    if let Value::Object(map) = &mut base {
        for (key, value) in patch {
            map.insert(key.clone(), value.clone());
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resume::drafts::{ContactDraft, ResumeDraft};
    use crate::resume::normalize::NamedEntry;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn work(company: &str, title: &str, badges: &[&str], tasks: &[&str]) -> WorkDraft {
        WorkDraft::from_value(&json!({
            "company": company,
            "title": title,
            "start": "2020",
            "badges": badges,
            "tasks": tasks,
        }))
    }

    async fn seeded(store: &MemoryStore) -> Resume {
        let draft = ResumeDraft {
            user_id: Some(Uuid::new_v4()),
            name: "Grace Hopper".into(),
            title: "Rear Admiral".into(),
            location: Some("Arlington, VA".into()),
            summary: "Compilers".into(),
            contact: Some(ContactDraft {
                email: Some("grace@example.com".into()),
                tel: Some("555-0100".into()),
                social: vec![SocialDraft {
                    name: "GitHub".into(),
                    url: "https://github.com/grace".into(),
                }],
            }),
            education: EducationDraft::list_from_value(&json!([
                {"school": "Vassar", "degree": "BA", "start": "1924", "end": "1928"},
                {"school": "Yale", "degree": "PhD", "start": "1930", "end": "1934"}
            ])),
            work: vec![
                work("Navy", "Officer", &["Leadership", "COBOL", "UNIVAC"], &["Led team", "Wrote manuals"]),
                work("Remington Rand", "Engineer", &["A-0"], &["Built compiler"]),
                work("DEC", "Consultant", &["VAX"], &["Advised"]),
            ],
            skills: vec![NamedEntry::new("COBOL")],
            projects: ProjectDraft::list_from_value(&json!([
                {"title": "FLOW-MATIC", "techStack": ["UNIVAC"], "link": {"label": "Docs", "href": "https://x"}}
            ])),
            ..Default::default()
        };
        store.create_resume(&draft).await.unwrap()
    }

    #[tokio::test]
    async fn test_skills_replace_is_idempotent() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;
        let value = json!(["Rust", {"name": "Go"}, {"name": {"name": "Zig"}}]);

        let once = apply_patch(&store, resume.id(), &path(&["skills"]), &value)
            .await
            .unwrap();
        let twice = apply_patch(&store, resume.id(), &path(&["skills"]), &value)
            .await
            .unwrap();

        let names = |r: &Resume| r.skills.iter().map(|s| s.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&once), vec!["Rust", "Go", "Zig"]);
        assert_eq!(names(&once), names(&twice));
    }

    #[tokio::test]
    async fn test_work_title_round_trip_leaves_siblings_intact() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;

        let after = apply_patch(&store, resume.id(), &path(&["work", "1", "title"]), &json!("X"))
            .await
            .unwrap();

        assert_eq!(after.work.len(), 3);
        assert_eq!(after.work[1].title, "X");
        assert_eq!(after.work[1].company, "Remington Rand");
        assert_eq!(after.work[1].badges, resume.work[1].badges);
        assert_eq!(after.work[0], resume.work[0]);
        assert_eq!(after.work[2], resume.work[2]);
    }

    #[tokio::test]
    async fn test_empty_badges_leave_tasks_untouched() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;
        assert_eq!(resume.work[0].badges.len(), 3);

        let after = apply_patch(&store, resume.id(), &path(&["work", "0", "badges"]), &json!([]))
            .await
            .unwrap();

        assert!(after.work[0].badges.is_empty());
        assert_eq!(after.work[0].tasks, resume.work[0].tasks);
        assert_eq!(after.work[0].tasks.len(), 2);
    }

    #[tokio::test]
    async fn test_document_patch_only_touches_present_fields() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;

        let after = apply_patch(&store, resume.id(), &[], &json!({"summary": "S", "title": null}))
            .await
            .unwrap();

        assert_eq!(after.header.summary, "S");
        assert_eq!(after.header.location, resume.header.location);
        assert_eq!(after.header.title, resume.header.title);
        assert_eq!(after.work, resume.work);
    }

    #[tokio::test]
    async fn test_rejected_document_patch_writes_nothing() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;

        let err = apply_patch(
            &store,
            resume.id(),
            &[],
            &json!({"summary": "S", "skills": ["Rust"], "work": "oops"}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = apply_patch(
            &store,
            resume.id(),
            &[],
            &json!({"contact": {"email": "new@example.com"}, "name": ["not", "text"]}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert_eq!(store.fetch_resume(resume.id()).await.unwrap().unwrap(), resume);
    }

    #[tokio::test]
    async fn test_document_patch_applies_every_section() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;

        let after = apply_patch(
            &store,
            resume.id(),
            &[],
            &json!({
                "name": "G. Hopper",
                "contact": {"tel": "555-0199"},
                "skills": ["FORTRAN"],
                "work": [{"company": "Harvard", "title": "Programmer", "badges": ["Mark I"]}],
                "projects": []
            }),
        )
        .await
        .unwrap();

        assert_eq!(after.header.name, "G. Hopper");
        let contact = after.contact.as_ref().unwrap();
        assert_eq!(contact.tel.as_deref(), Some("555-0199"));
        assert_eq!(contact.email.as_deref(), Some("grace@example.com"));
        assert_eq!(after.skills.len(), 1);
        assert_eq!(after.work.len(), 1);
        assert_eq!(after.work[0].badges[0].name, "Mark I");
        assert!(after.projects.is_empty());
        assert_eq!(after.education, resume.education);
    }

    #[tokio::test]
    async fn test_document_patch_applies_empty_string() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;
        let after = apply_patch(&store, resume.id(), &[], &json!({"summary": ""}))
            .await
            .unwrap();
        assert_eq!(after.header.summary, "");
    }

    #[tokio::test]
    async fn test_out_of_bounds_index_leaves_resume_unchanged() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;

        let err = apply_patch(
            &store,
            resume.id(),
            &path(&["education", "99", "school"]),
            &json!("X"),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            AppError::IndexOutOfBounds {
                collection: "education",
                index: 99,
                len: 2
            }
        ));
        let after = store.fetch_resume(resume.id()).await.unwrap().unwrap();
        assert_eq!(after, resume);
    }

    #[tokio::test]
    async fn test_unknown_path_is_rejected() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;
        let err = apply_patch(&store, resume.id(), &path(&["work", "0", "salary"]), &json!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownPath(_)));
    }

    #[tokio::test]
    async fn test_missing_resume_is_not_found() {
        let store = MemoryStore::new();
        let err = apply_patch(&store, Uuid::new_v4(), &path(&["summary"]), &json!("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_null_on_required_scalar_is_validation_error() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;
        let err = apply_patch(&store, resume.id(), &path(&["name"]), &Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let after = apply_patch(&store, resume.id(), &path(&["location"]), &Value::Null)
            .await
            .unwrap();
        assert_eq!(after.header.location, None);
    }

    #[tokio::test]
    async fn test_work_description_object_is_stored_as_json_text() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;
        let after = apply_patch(
            &store,
            resume.id(),
            &path(&["work", "2", "description"]),
            &json!({"text": "Advised on VAX"}),
        )
        .await
        .unwrap();
        assert_eq!(after.work[2].description, r#"{"text":"Advised on VAX"}"#);
    }

    #[tokio::test]
    async fn test_work_entry_is_recreated_in_place() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;
        let after = apply_patch(
            &store,
            resume.id(),
            &path(&["work", "1"]),
            &json!({"company": "UNIVAC", "title": "Director", "badges": [{"name": {"name": "Math"}}]}),
        )
        .await
        .unwrap();

        assert_eq!(after.work.len(), 3);
        assert_eq!(after.work[1].company, "UNIVAC");
        assert_ne!(after.work[1].id, resume.work[1].id);
        assert_eq!(after.work[1].badges[0].name, "Math");
        assert!(after.work[1].tasks.is_empty());
        assert_eq!(after.work[0], resume.work[0]);
        assert_eq!(after.work[2], resume.work[2]);
    }

    #[tokio::test]
    async fn test_project_link_defaults_and_removal() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;

        let after = apply_patch(
            &store,
            resume.id(),
            &path(&["projects", "0", "link"]),
            &json!({"href": "https://flow.example"}),
        )
        .await
        .unwrap();
        let link = after.projects[0].link.as_ref().unwrap();
        assert_eq!(link.label, "Project Link");
        assert_eq!(link.href, "https://flow.example");

        let after = apply_patch(
            &store,
            resume.id(),
            &path(&["projects", "0", "link"]),
            &json!({"label": "", "href": ""}),
        )
        .await
        .unwrap();
        assert!(after.projects[0].link.is_none());
    }

    #[tokio::test]
    async fn test_contact_object_keeps_empty_email() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;
        let after = apply_patch(
            &store,
            resume.id(),
            &path(&["contact"]),
            &json!({"email": "", "tel": "555-0199", "social": [{"name": "X", "url": "https://x.com/g"}]}),
        )
        .await
        .unwrap();
        let contact = after.contact.unwrap();
        assert_eq!(contact.email.as_deref(), Some("grace@example.com"));
        assert_eq!(contact.tel.as_deref(), Some("555-0199"));
        assert_eq!(contact.social.len(), 1);
        assert_eq!(contact.social[0].name, "X");
    }

    #[tokio::test]
    async fn test_social_field_by_position() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;
        let after = apply_patch(
            &store,
            resume.id(),
            &path(&["contact", "social", "0", "url"]),
            &json!("https://github.com/ghopper"),
        )
        .await
        .unwrap();
        assert_eq!(after.contact.unwrap().social[0].url, "https://github.com/ghopper");

        let err = apply_patch(
            &store,
            resume.id(),
            &path(&["contact", "social", "3", "url"]),
            &json!("x"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::IndexOutOfBounds { .. }));
    }

    #[tokio::test]
    async fn test_education_entry_merges_present_fields() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;
        let after = apply_patch(
            &store,
            resume.id(),
            &path(&["education", "1"]),
            &json!({"degree": "PhD Mathematics"}),
        )
        .await
        .unwrap();
        assert_eq!(after.education[1].degree, "PhD Mathematics");
        assert_eq!(after.education[1].school, "Yale");
        assert_eq!(after.education[1].id, resume.education[1].id);
    }

    #[tokio::test]
    async fn test_whole_collection_requires_array() {
        let store = MemoryStore::new();
        let resume = seeded(&store).await;
        let err = apply_patch(&store, resume.id(), &path(&["work"]), &json!({"company": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}

//! Whole-document operations: fetch, duplicate, create (duplicate-or-seed) and delete.

use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::Resume;
use crate::resume::drafts::{ContactDraft, ResumeDraft};
use crate::resume::patch::apply_patch;
use crate::resume::seed::default_resume;
use crate::store::ResumeStore;

const COPY_SUFFIX: &str = " (Copy)";

pub async fn get_resume<S: ResumeStore + ?Sized>(store: &S, id: Uuid) -> Result<Resume, AppError> {
    store
        .fetch_resume(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))
}

/// Deep copy of `source_id` under fresh ids, owned by `owner_id`, with name and title
/// marked as a copy.
pub async fn duplicate_resume<S: ResumeStore + ?Sized>(
    store: &S,
    owner_id: Uuid,
    source_id: Uuid,
) -> Result<Resume, AppError> {
    let source = get_resume(store, source_id).await?;
    let mut draft = ResumeDraft::from_resume(&source);
    draft.user_id = Some(owner_id);
    draft.name.push_str(COPY_SUFFIX);
    draft.title.push_str(COPY_SUFFIX);
    if draft.contact.is_none() {
        draft.contact = Some(ContactDraft::default());
    }

    let copy = store.create_resume(&draft).await?;
    info!("Duplicated resume {source_id} into {}", copy.id());
    Ok(copy)
}

/// Duplicates the owner's most recently updated resume, or seeds the starter resume
/// when the owner has none.
pub async fn create_resume<S: ResumeStore + ?Sized>(
    store: &S,
    owner_id: Uuid,
) -> Result<Resume, AppError> {
    match store.latest_resume(owner_id).await? {
        Some(latest) => duplicate_resume(store, owner_id, latest.id()).await,
        None => {
            let seeded = store.create_resume(&default_resume(owner_id)).await?;
            info!("Seeded starter resume {} for owner {owner_id}", seeded.id());
            Ok(seeded)
        }
    }
}

pub async fn create_resume_with_title<S: ResumeStore + ?Sized>(
    store: &S,
    owner_id: Uuid,
    title: &str,
) -> Result<Resume, AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    let created = create_resume(store, owner_id).await?;
    apply_patch(
        store,
        created.id(),
        &["title".to_string()],
        &Value::String(title.to_string()),
    )
    .await
}

pub async fn delete_resume<S: ResumeStore + ?Sized>(store: &S, id: Uuid) -> Result<(), AppError> {
    if !store.delete_resume(id).await? {
        return Err(AppError::NotFound("Resume not found".to_string()));
    }
    info!("Deleted resume {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_create_seeds_when_owner_has_nothing() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let resume = create_resume(&store, owner).await.unwrap();
        assert_eq!(resume.header.user_id, Some(owner));
        assert_eq!(resume.header.title, resume.header.name);
        assert!(!resume.work.is_empty());
        assert!(resume.contact.is_some());
    }

    #[tokio::test]
    async fn test_create_duplicates_latest_with_fresh_ids() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let first = create_resume(&store, owner).await.unwrap();
        let second = create_resume(&store, owner).await.unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(second.header.name, format!("{} (Copy)", first.header.name));
        assert_eq!(second.header.title, format!("{} (Copy)", first.header.title));
        assert_eq!(second.work.len(), first.work.len());
        assert_ne!(second.work[0].id, first.work[0].id);
        assert_eq!(second.work[0].badges.len(), first.work[0].badges.len());
        assert_eq!(
            second.projects[0].link.as_ref().map(|l| &l.href),
            first.projects[0].link.as_ref().map(|l| &l.href)
        );
        assert_eq!(store.list_resumes(owner).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_with_title_sets_title() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let resume = create_resume_with_title(&store, owner, "Platform Engineer")
            .await
            .unwrap();
        assert_eq!(resume.header.title, "Platform Engineer");

        let err = create_resume_with_title(&store, owner, " ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_missing_source_is_not_found() {
        let store = MemoryStore::new();
        let err = duplicate_resume(&store, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_found() {
        let store = MemoryStore::new();
        let resume = create_resume(&store, Uuid::new_v4()).await.unwrap();
        delete_resume(&store, resume.id()).await.unwrap();
        assert!(matches!(
            delete_resume(&store, resume.id()).await,
            Err(AppError::NotFound(_))
        ));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Scalar attributes of a resume row, without any child collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ResumeHeader {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub title: String,
    pub initials: Option<String>,
    pub location: Option<String>,
    pub location_link: Option<String>,
    pub about: Option<String>,
    pub summary: String,
    pub avatar_url: Option<String>,
    pub personal_website_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full snapshot of a resume and every descendant, children in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    #[serde(flatten)]
    pub header: ResumeHeader,
    pub contact: Option<Contact>,
    pub education: Vec<Education>,
    pub work: Vec<Work>,
    pub skills: Vec<Skill>,
    pub projects: Vec<Project>,
}

/// Listing shape: scalars plus contact, no heavy collections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeListing {
    #[serde(flatten)]
    pub header: ResumeHeader,
    pub contact: Option<Contact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub email: Option<String>,
    pub tel: Option<String>,
    #[sqlx(skip)]
    pub social: Vec<Social>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Social {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub school: String,
    pub degree: String,
    pub start: String,
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub company: String,
    pub link: Option<String>,
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub description: String,
    #[sqlx(skip)]
    pub badges: Vec<Badge>,
    #[sqlx(skip)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: Uuid,
    pub work_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub work_id: Uuid,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(skip)]
    pub tech_stack: Vec<TechTag>,
    #[sqlx(skip)]
    pub link: Option<ProjectLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TechTag {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLink {
    pub id: Uuid,
    pub project_id: Uuid,
    pub label: String,
    pub href: String,
}

impl Resume {
    pub fn id(&self) -> Uuid {
        self.header.id
    }

    pub fn listing(&self) -> ResumeListing {
        ResumeListing {
            header: self.header.clone(),
            contact: self.contact.clone(),
        }
    }
}

//! Write-side shapes: what the store needs to create resume content.
//!
//! Drafts are decoded leniently from arbitrary JSON (client patches and model output alike).
//! Missing text becomes empty text, badges/skills/tech/tasks go through the normalizer, and
//! nothing here ever fails on shape.

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::models::resume::{Project, Resume, Work};
use crate::resume::normalize::{normalize_names, normalize_tasks, NamedEntry, TaskEntry};

pub const DEFAULT_LINK_LABEL: &str = "Project Link";
pub const DEFAULT_LINK_HREF: &str = "#";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDraft {
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
    pub contact: Option<ContactDraft>,
    pub education: Vec<EducationDraft>,
    pub work: Vec<WorkDraft>,
    pub skills: Vec<NamedEntry>,
    pub projects: Vec<ProjectDraft>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContactDraft {
    pub email: Option<String>,
    pub tel: Option<String>,
    pub social: Vec<SocialDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialDraft {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationDraft {
    pub school: String,
    pub degree: String,
    pub start: String,
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkDraft {
    pub company: String,
    pub link: Option<String>,
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub description: String,
    pub badges: Vec<NamedEntry>,
    pub tasks: Vec<TaskEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    pub title: String,
    pub description: Option<String>,
    pub tech_stack: Vec<NamedEntry>,
    pub link: Option<LinkDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkDraft {
    pub label: String,
    pub href: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Lenient text coercion
// ────────────────────────────────────────────────────────────────────────────

/// Text for an optional scalar column. `null`/absent/empty-container map to `None`.
pub fn optional_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => serde_json::to_string(other).ok(),
    }
}

/// Text for a required column; absent values become the empty string.
pub fn required_text(value: Option<&Value>) -> String {
    optional_text(value).unwrap_or_default()
}

/// Description columns accept anything: structured values are stored as their JSON text.
pub fn description_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(true)) => "true".to_string(),
        Some(other) => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    optional_text(value).filter(|s| !s.is_empty())
}

fn array_of<'a>(value: Option<&'a Value>) -> &'a [Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

// ────────────────────────────────────────────────────────────────────────────
// Decoding
// ────────────────────────────────────────────────────────────────────────────

impl SocialDraft {
    pub fn from_value(value: &Value) -> Self {
        SocialDraft {
            name: required_text(value.get("name")),
            url: required_text(value.get("url")),
        }
    }

    pub fn list_from_value(value: &Value) -> Vec<Self> {
        array_of(Some(value)).iter().map(Self::from_value).collect()
    }
}

impl EducationDraft {
    pub fn from_value(value: &Value) -> Self {
        EducationDraft {
            school: required_text(value.get("school")),
            degree: required_text(value.get("degree")),
            start: required_text(value.get("start")),
            end: optional_text(value.get("end")),
        }
    }

    pub fn list_from_value(value: &Value) -> Vec<Self> {
        array_of(Some(value)).iter().map(Self::from_value).collect()
    }
}

impl WorkDraft {
    pub fn from_value(value: &Value) -> Self {
        WorkDraft {
            company: required_text(value.get("company")),
            link: optional_text(value.get("link")),
            title: required_text(value.get("title")),
            start: required_text(value.get("start")),
            end: optional_text(value.get("end")),
            description: description_text(value.get("description")),
            badges: value.get("badges").map(normalize_names).unwrap_or_default(),
            tasks: value.get("tasks").map(normalize_tasks).unwrap_or_default(),
        }
    }

    pub fn list_from_value(value: &Value) -> Vec<Self> {
        array_of(Some(value)).iter().map(Self::from_value).collect()
    }

    pub fn from_work(work: &Work) -> Self {
        WorkDraft {
            company: work.company.clone(),
            link: work.link.clone(),
            title: work.title.clone(),
            start: work.start.clone(),
            end: work.end.clone(),
            description: work.description.clone(),
            badges: work.badges.iter().map(|b| NamedEntry::new(&b.name)).collect(),
            tasks: work
                .tasks
                .iter()
                .map(|t| TaskEntry::new(&t.description))
                .collect(),
        }
    }
}

impl LinkDraft {
    /// A link exists only when a label or an href was given; the other falls back
    /// to placeholder text.
    pub fn from_value(value: &Value) -> Option<Self> {
        let label = non_empty(value.get("label"));
        let href = non_empty(value.get("href"));
        if label.is_none() && href.is_none() {
            return None;
        }
        Some(LinkDraft {
            label: label.unwrap_or_else(|| DEFAULT_LINK_LABEL.to_string()),
            href: href.unwrap_or_else(|| DEFAULT_LINK_HREF.to_string()),
        })
    }
}

impl ProjectDraft {
    pub fn from_value(value: &Value) -> Self {
        ProjectDraft {
            title: required_text(value.get("title")),
            description: value
                .get("description")
                .filter(|v| !v.is_null())
                .map(|v| description_text(Some(v))),
            tech_stack: value
                .get("techStack")
                .map(normalize_names)
                .unwrap_or_default(),
            link: value.get("link").and_then(LinkDraft::from_value),
        }
    }

    pub fn list_from_value(value: &Value) -> Vec<Self> {
        array_of(Some(value)).iter().map(Self::from_value).collect()
    }

    pub fn from_project(project: &Project) -> Self {
        ProjectDraft {
            title: project.title.clone(),
            description: project.description.clone(),
            tech_stack: project
                .tech_stack
                .iter()
                .map(|t| NamedEntry::new(&t.name))
                .collect(),
            link: project.link.as_ref().map(|l| LinkDraft {
                label: l.label.clone(),
                href: l.href.clone(),
            }),
        }
    }
}

impl ResumeDraft {
    /// Deep copy of an existing resume's content, ready to be inserted under fresh ids.
    pub fn from_resume(resume: &Resume) -> Self {
        let h = &resume.header;
        ResumeDraft {
            user_id: h.user_id,
            name: h.name.clone(),
            title: h.title.clone(),
            initials: h.initials.clone(),
            location: h.location.clone(),
            location_link: h.location_link.clone(),
            about: h.about.clone(),
            summary: h.summary.clone(),
            avatar_url: h.avatar_url.clone(),
            personal_website_url: h.personal_website_url.clone(),
            contact: resume.contact.as_ref().map(|c| ContactDraft {
                email: c.email.clone(),
                tel: c.tel.clone(),
                social: c
                    .social
                    .iter()
                    .map(|s| SocialDraft {
                        name: s.name.clone(),
                        url: s.url.clone(),
                    })
                    .collect(),
            }),
            education: resume
                .education
                .iter()
                .map(|e| EducationDraft {
                    school: e.school.clone(),
                    degree: e.degree.clone(),
                    start: e.start.clone(),
                    end: e.end.clone(),
                })
                .collect(),
            work: resume.work.iter().map(WorkDraft::from_work).collect(),
            skills: resume
                .skills
                .iter()
                .map(|s| NamedEntry::new(&s.name))
                .collect(),
            projects: resume.projects.iter().map(ProjectDraft::from_project).collect(),
        }
    }
}

use serde::Serialize;
use serde_json::{Map, Value};

use crate::resume::drafts::{optional_text, EducationDraft, ProjectDraft, WorkDraft};
use crate::resume::normalize::{normalize_names, NamedEntry};

/// A model-proposed resume fragment, already run through the normalizer.
///
/// Every field is optional: a field the model left out stays `None` and is taken
/// from the original resume when the candidate is committed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementCandidate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<NamedEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work: Option<Vec<WorkDraft>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<Vec<EducationDraft>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<ProjectDraft>>,
}

fn array_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| v.is_array())
}

impl RefinementCandidate {
    /// Decodes a JSON object leniently. A collection counts as present only when it is an
    /// array; anything else is treated as absent.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        RefinementCandidate {
            name: optional_text(map.get("name")),
            title: optional_text(map.get("title")),
            location: optional_text(map.get("location")),
            summary: optional_text(map.get("summary")),
            skills: array_field(map, "skills").map(normalize_names),
            work: array_field(map, "work").map(WorkDraft::list_from_value),
            education: array_field(map, "education").map(EducationDraft::list_from_value),
            projects: array_field(map, "projects").map(ProjectDraft::list_from_value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resume::normalize::TaskEntry;
    use serde_json::json;

    fn candidate(value: Value) -> RefinementCandidate {
        RefinementCandidate::from_map(value.as_object().unwrap())
    }

    #[test]
    fn test_normalizes_nested_entries() {
        let c = candidate(json!({
            "summary": "Rust engineer",
            "skills": ["Rust", {"name": {"name": "Tokio"}}, ""],
            "work": [{
                "company": "Acme",
                "title": "Engineer",
                "badges": ["Remote"],
                "tasks": ["  Shipped  "]
            }]
        }));
        assert_eq!(c.summary.as_deref(), Some("Rust engineer"));
        assert_eq!(
            c.skills.unwrap(),
            vec![NamedEntry::new("Rust"), NamedEntry::new("Tokio")]
        );
        let work = c.work.unwrap();
        assert_eq!(work[0].badges, vec![NamedEntry::new("Remote")]);
        assert_eq!(work[0].tasks, vec![TaskEntry::new("Shipped")]);
        assert!(c.education.is_none());
        assert!(c.projects.is_none());
    }

    #[test]
    fn test_non_array_collections_are_absent() {
        let c = candidate(json!({"skills": "Rust, Go", "work": {"company": "Acme"}}));
        assert!(c.skills.is_none());
        assert!(c.work.is_none());
    }

    #[test]
    fn test_serialized_candidate_decodes_to_itself() {
        let c = candidate(json!({
            "name": "Alex",
            "projects": [{"title": "tinyqueue", "techStack": ["Rust"], "link": {"href": "https://x.dev"}}],
            "education": [{"school": "TU", "degree": "MSc", "start": "2012", "end": null}]
        }));
        let value = serde_json::to_value(&c).unwrap();
        assert!(value.get("title").is_none());
        assert_eq!(candidate(value), c);
    }
}

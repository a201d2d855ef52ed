//! Content normalizer: turns loosely-typed JSON into canonical `{name}` / `{description}` entries.
//!
//! Model output is inconsistent about badges, skills, tech tags and tasks: sometimes plain
//! strings, sometimes objects, sometimes objects wrapped in objects. Each element is decoded
//! into a small shape union first and the canonical text is taken from that union, so the
//! normalizer is a total function: it never fails, it only drops entries that end up empty.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical shape of a badge, skill or tech tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntry {
    pub name: String,
}

/// Canonical shape of a work task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub description: String,
}

impl NamedEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TaskEntry {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// How a single element arrived, relative to the key the entity expects.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// `"Rust"`
    Scalar(String),
    /// `{"name": "Rust"}`
    Keyed(String),
    /// `{"name": {"name": "Rust"}}`, unwrapped exactly one level.
    DoubleWrapped(String),
    /// Anything else; rendered to text as a last resort.
    Unrecognized(Value),
}

impl Shape {
    pub fn decode(value: &Value, key: &str) -> Shape {
        match value {
            Value::String(s) => Shape::Scalar(s.clone()),
            Value::Object(map) => match map.get(key) {
                Some(Value::String(s)) => Shape::Keyed(s.clone()),
                Some(Value::Object(inner)) => match inner.get(key) {
                    Some(Value::String(s)) => Shape::DoubleWrapped(s.clone()),
                    _ => Shape::Unrecognized(value.clone()),
                },
                _ => Shape::Unrecognized(value.clone()),
            },
            other => Shape::Unrecognized(other.clone()),
        }
    }

    pub fn into_text(self, key: &str) -> String {
        match self {
            Shape::Scalar(s) | Shape::Keyed(s) | Shape::DoubleWrapped(s) => s,
            Shape::Unrecognized(value) => render_unrecognized(&value, key),
        }
    }
}

/// Best-effort text for a value of unknown shape.
///
/// `null`, `false` and empty containers become the empty string (and are later dropped).
/// An object whose `key` holds a number or bool yields that scalar; any other object
/// or array is serialized as JSON.
fn render_unrecognized(value: &Value, key: &str) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "true".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Object(map) if map.is_empty() => String::new(),
        Value::Array(items) if items.is_empty() => String::new(),
        Value::Object(map) => match map.get(key) {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(true)) => "true".to_string(),
            Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
            _ => serde_json::to_string(value).unwrap_or_default(),
        },
        Value::Array(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Normalizes one element into a `{name}` entry. `None` when the result is blank.
pub fn normalize_name(value: &Value) -> Option<NamedEntry> {
    let name = Shape::decode(value, "name").into_text("name");
    if name.trim().is_empty() {
        return None;
    }
    Some(NamedEntry { name })
}

/// Normalizes one element into a `{description}` entry, trimmed. `None` when blank.
pub fn normalize_task(value: &Value) -> Option<TaskEntry> {
    let description = Shape::decode(value, "description")
        .into_text("description")
        .trim()
        .to_string();
    if description.is_empty() {
        return None;
    }
    Some(TaskEntry { description })
}

/// Normalizes every element of an array. Non-array input yields an empty list.
pub fn normalize_names(value: &Value) -> Vec<NamedEntry> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(normalize_name).collect())
        .unwrap_or_default()
}

pub fn normalize_tasks(value: &Value) -> Vec<TaskEntry> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(normalize_task).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keyed_object_kept_as_is() {
        assert_eq!(
            normalize_name(&json!({"name": "Rust"})),
            Some(NamedEntry::new("Rust"))
        );
    }

    #[test]
    fn test_plain_string_is_wrapped() {
        assert_eq!(normalize_name(&json!("Kubernetes")), Some(NamedEntry::new("Kubernetes")));
    }

    #[test]
    fn test_one_level_double_wrap_is_unwrapped() {
        assert_eq!(
            normalize_name(&json!({"name": {"name": "TypeScript"}})),
            Some(NamedEntry::new("TypeScript"))
        );
    }

    #[test]
    fn test_two_level_double_wrap_is_rendered_as_json() {
        // Only one level is unwrapped; deeper nesting falls through to the JSON rendering.
        let input = json!({"name": {"name": {"name": "Go"}}});
        let entry = normalize_name(&input).unwrap();
        assert_eq!(entry.name, r#"{"name":{"name":{"name":"Go"}}}"#);
    }

    #[test]
    fn test_output_is_a_fixed_point() {
        let inputs = [
            json!("Rust"),
            json!({"name": "Rust"}),
            json!({"name": {"name": "Rust"}}),
            json!({"name": {"name": {"name": "Rust"}}}),
            json!({"label": "odd"}),
            json!(42),
        ];
        for input in inputs {
            let once = normalize_name(&input).unwrap();
            let rewrapped = serde_json::to_value(&once).unwrap();
            let twice = normalize_name(&rewrapped).unwrap();
            assert_eq!(once, twice, "not stable for {input}");
            let wrapped_again = json!({ "name": serde_json::to_value(&once).unwrap() });
            assert_eq!(normalize_name(&wrapped_again).unwrap(), once);
        }
    }

    #[test]
    fn test_empty_inputs_emit_nothing() {
        assert_eq!(normalize_name(&json!("")), None);
        assert_eq!(normalize_name(&json!("   ")), None);
        assert_eq!(normalize_name(&Value::Null), None);
        assert_eq!(normalize_name(&json!({})), None);
        assert_eq!(normalize_name(&json!({"name": null})), None);
        assert_eq!(normalize_name(&json!({"name": "  "})), None);
    }

    #[test]
    fn test_scalar_name_property_is_stringified() {
        assert_eq!(normalize_name(&json!({"name": 2024})), Some(NamedEntry::new("2024")));
        assert_eq!(normalize_name(&json!(3.5)), Some(NamedEntry::new("3.5")));
    }

    #[test]
    fn test_object_without_name_becomes_json_text() {
        let entry = normalize_name(&json!({"skill": "SQL"})).unwrap();
        assert_eq!(entry.name, r#"{"skill":"SQL"}"#);
    }

    #[test]
    fn test_normalize_names_filters_and_preserves_order() {
        let input = json!(["Rust", "", {"name": "Go"}, null, {"name": {"name": "Zig"}}]);
        let names: Vec<String> = normalize_names(&input).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Rust", "Go", "Zig"]);
    }

    #[test]
    fn test_normalize_names_on_non_array_is_empty() {
        assert!(normalize_names(&json!("Rust")).is_empty());
        assert!(normalize_names(&Value::Null).is_empty());
    }

    #[test]
    fn test_tasks_accept_strings_and_objects_and_trim() {
        let input = json!([
            "  Shipped the billing service  ",
            {"description": "Cut p95 latency by 30%"},
            {"description": {"description": "Mentored two engineers"}},
            {"description": "   "},
            {}
        ]);
        let tasks = normalize_tasks(&input);
        assert_eq!(
            tasks,
            vec![
                TaskEntry::new("Shipped the billing service"),
                TaskEntry::new("Cut p95 latency by 30%"),
                TaskEntry::new("Mentored two engineers"),
            ]
        );
    }

    #[test]
    fn test_shape_decode_variants() {
        assert_eq!(Shape::decode(&json!("a"), "name"), Shape::Scalar("a".into()));
        assert_eq!(
            Shape::decode(&json!({"name": "a"}), "name"),
            Shape::Keyed("a".into())
        );
        assert_eq!(
            Shape::decode(&json!({"name": {"name": "a"}}), "name"),
            Shape::DoubleWrapped("a".into())
        );
        assert!(matches!(
            Shape::decode(&json!([1, 2]), "name"),
            Shape::Unrecognized(_)
        ));
    }
}

//! Recovery of near-miss JSON from model output.
//!
//! The scanner tracks whether it is inside a string literal, so repairs never touch
//! string contents: a raw line break inside a string closes it, a string that starts
//! on a new line right after a finished value gets the missing comma, and commas
//! directly before `}` or `]` are dropped.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::llm_client::strip_json_fences;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("model response is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("model response is JSON but not an object")]
    NotAnObject,
}

/// Pulls the JSON body out of a response that may be fenced or wrapped in prose.
pub fn extract_json_body(raw: &str) -> &str {
    let mut body = strip_json_fences(raw);

    // A fenced block somewhere inside the text.
    if let Some(start) = body.find("```") {
        let after = &body[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            body = after[..end].trim();
        }
    }

    if !body.starts_with('{') {
        if let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) {
            if start < end {
                body = &body[start..=end];
            }
        }
    }
    body
}

pub fn repair_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(ch);
                continue;
            }
            match ch {
                '\\' => {
                    escaped = true;
                    out.push(ch);
                }
                '"' => {
                    in_string = false;
                    out.push(ch);
                }
                '\n' | '\r' => {
                    out.push('"');
                    out.push(ch);
                    in_string = false;
                }
                _ => out.push(ch),
            }
            continue;
        }

        match ch {
            '"' => {
                insert_missing_comma(&mut out);
                in_string = true;
                out.push(ch);
            }
            '}' | ']' => {
                drop_trailing_comma(&mut out);
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }

    if in_string {
        out.push('"');
    }
    out
}

/// A string opening on a new line directly after a finished value needs a separator.
fn insert_missing_comma(out: &mut String) {
    let value_end = out.trim_end().len();
    let gap = &out[value_end..];
    let ends_value = out[..value_end].ends_with(['"', '}', ']']);
    if ends_value && gap.contains(['\n', '\r']) {
        out.insert(value_end, ',');
    }
}

fn drop_trailing_comma(out: &mut String) {
    let end = out.trim_end().len();
    if out[..end].ends_with(',') {
        out.remove(end - 1);
    }
}

/// Parses model output into a JSON object, trying the text as-is before repairing it.
pub fn parse_model_json(raw: &str) -> Result<Map<String, Value>, ParseError> {
    let body = extract_json_body(raw);
    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(e) => {
            debug!("Model response did not parse as-is ({e}); attempting repair");
            serde_json::from_str::<Value>(&repair_json(body))?
        }
    };
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ParseError::NotAnObject),
    }
}

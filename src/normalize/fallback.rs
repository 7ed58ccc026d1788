//! Fallback synthesiser: one best-effort task when no task array exists.
//!
//! This is what keeps the "at least one task" guarantee under any model
//! reply, including replies that are not JSON at all.

use super::title::normalize_title;
use crate::output::Task;
use serde_json::Value;

/// Fixed title of the synthesised task.
pub const FALLBACK_TITLE: &str = "Document Analysis";

/// Description when the reply carries nothing usable.
pub const FALLBACK_DESCRIPTION: &str = "Analyze the provided document for tasks and requirements";

/// Description when the reply could not be parsed.
pub const PARSE_ERROR_DESCRIPTION: &str =
    "There was an error parsing the AI response. Please try again or contact support.";

/// What the synthesiser has to work with.
#[derive(Debug, Clone, Copy)]
pub enum FallbackSource<'a> {
    /// The reply was not valid JSON.
    ParseError,
    /// Valid JSON without a recognisable task array.
    Parsed(&'a Value),
}

/// Build the single fallback task (`task-1`).
pub fn synthesize_fallback(source: FallbackSource<'_>) -> Vec<Task> {
    let description = match source {
        FallbackSource::ParseError => PARSE_ERROR_DESCRIPTION.to_string(),
        FallbackSource::Parsed(value) => describe(value),
    };
    vec![Task::new(1, FALLBACK_TITLE, description)]
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) if !s.trim().is_empty() => s.clone(),
        Value::Object(fields) => {
            let pairs: Vec<String> = fields
                .iter()
                .filter_map(|(key, v)| {
                    let text = v.as_str()?;
                    let label = normalize_title(key);
                    let label = if label.is_empty() { key.clone() } else { label };
                    Some(format!("{label}: {text}"))
                })
                .collect();
            if pairs.is_empty() {
                FALLBACK_DESCRIPTION.to_string()
            } else {
                format!("Document analysis: {}", pairs.join(", "))
            }
        }
        _ => FALLBACK_DESCRIPTION.to_string(),
    }
}

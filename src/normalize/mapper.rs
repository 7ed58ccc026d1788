//! Task mapper: heterogeneous array items → canonical [`Task`]s.
//!
//! Every item yields exactly one task at its 1-based position, so the output
//! length always equals the input length. Missing fields are replaced by
//! defaults and reported to the sink; nothing here can fail.

use super::shape::value_kind;
use super::title::normalize_title;
use crate::diagnostics::DiagnosticSink;
use crate::error::Anomaly;
use crate::output::Task;
use serde_json::{Map, Value};

/// Description used when an item carries none.
pub const DEFAULT_DESCRIPTION: &str = "No description provided";

/// Title used when a title field is present but normalises to nothing.
pub const UNTITLED: &str = "Untitled Task";

/// Title fields, highest priority first.
pub const TITLE_FIELDS: [&str; 4] = ["task", "title", "name", "id"];

/// Description fields, highest priority first.
pub const DESCRIPTION_FIELDS: [&str; 3] = ["description", "desc", "details"];

/// Map every item of a recognised array to a task.
pub fn map_array_to_tasks(items: &[Value], sink: &dyn DiagnosticSink) -> Vec<Task> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| map_item(i + 1, item, sink))
        .collect()
}

fn map_item(position: usize, item: &Value, sink: &dyn DiagnosticSink) -> Task {
    match item {
        Value::String(s) => Task::new(
            position,
            titled(position, s, sink),
            DEFAULT_DESCRIPTION,
        ),
        Value::Object(fields) => map_object(position, fields, sink),
        other => {
            sink.on_anomaly(&Anomaly::NonObjectItem {
                index: position,
                kind: value_kind(other).to_string(),
            });
            Task::new(position, fallback_title(position), DEFAULT_DESCRIPTION)
        }
    }
}

fn map_object(position: usize, fields: &Map<String, Value>, sink: &dyn DiagnosticSink) -> Task {
    let title = match first_text(fields, &TITLE_FIELDS) {
        Some(raw) => titled(position, &raw, sink),
        None => {
            sink.on_anomaly(&Anomaly::MissingTitle { index: position });
            fallback_title(position)
        }
    };

    let description = first_text(fields, &DESCRIPTION_FIELDS).unwrap_or_else(|| {
        sink.on_anomaly(&Anomaly::MissingDescription { index: position });
        DEFAULT_DESCRIPTION.to_string()
    });

    Task::new(position, title, description)
}

/// Normalise a candidate title; blank results become [`UNTITLED`].
fn titled(position: usize, raw: &str, sink: &dyn DiagnosticSink) -> String {
    let title = normalize_title(raw);
    if title.is_empty() {
        sink.on_anomaly(&Anomaly::UnusableTitle { index: position });
        UNTITLED.to_string()
    } else {
        title
    }
}

fn fallback_title(position: usize) -> String {
    format!("Task {position}")
}

/// First field with a usable scalar value.
///
/// Blank strings count as absent. Numbers and booleans are rendered as text
/// (models sometimes emit numeric ids); nested values are skipped.
fn first_text(fields: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match fields.get(*name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

//! Response normalisation: untrusted model reply → non-empty task list.
//!
//! ## Data Flow
//!
//! ```text
//! raw reply ──▶ unfence ──▶ parse ──▶ classify ──▶ map      ──▶ Vec<Task>
//!                              │          │
//!                              └──────────┴──▶ fallback (exactly one task)
//! ```
//!
//! 1. [`strip_code_fences`]: models sometimes wrap JSON in ```` ```json ````
//!    fences despite being told not to
//! 2. `serde_json` parse; failure goes straight to [`fallback`]
//! 3. [`shape`]: ordered matchers locate the task array
//! 4. [`mapper`]: one task per array item, defaults for missing fields
//! 5. [`fallback`]: a single synthesised task when nothing matched
//!
//! [`title`] normalisation is applied inside the mapper and the fallback.
//! Every recovered problem goes to the [`DiagnosticSink`]; nothing here
//! returns an error.

pub mod fallback;
pub mod mapper;
pub mod shape;
pub mod title;

pub use fallback::{synthesize_fallback, FallbackSource};
pub use mapper::map_array_to_tasks;
pub use shape::{classify, Classification, MatchedArray, ShapeKind};
pub use title::normalize_title;

use crate::diagnostics::DiagnosticSink;
use crate::error::Anomaly;
use crate::output::Task;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Normalise a raw model reply into at least one task.
pub fn normalize_response(raw: &str, sink: &dyn DiagnosticSink) -> Vec<Task> {
    let body = strip_code_fences(raw);

    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            sink.on_anomaly(&Anomaly::MalformedResponse {
                detail: e.to_string(),
            });
            return synthesize_fallback(FallbackSource::ParseError);
        }
    };

    normalize_value(&value, sink)
}

/// Normalise an already-parsed reply.
pub fn normalize_value(value: &Value, sink: &dyn DiagnosticSink) -> Vec<Task> {
    match classify(value) {
        Classification::Matched(matched) => {
            debug!(
                "Task array recognised as {:?} (key: {:?}, {} items)",
                matched.kind,
                matched.key,
                matched.items.len()
            );
            map_array_to_tasks(matched.items, sink)
        }
        Classification::Unrecognized => {
            if let Some(field) = empty_array_field(value) {
                sink.on_anomaly(&Anomaly::EmptyArray { field });
            }
            sink.on_anomaly(&Anomaly::UnrecognizedShape {
                kind: shape::value_kind(value).to_string(),
            });
            synthesize_fallback(FallbackSource::Parsed(value))
        }
    }
}

/// Name of the empty array that would otherwise have matched, if any.
fn empty_array_field(value: &Value) -> Option<String> {
    match value {
        Value::Array(a) if a.is_empty() => Some("(root)".to_string()),
        Value::Object(_) => match value.get("tasks") {
            Some(Value::Array(a)) if a.is_empty() => Some("tasks".to_string()),
            _ => None,
        },
        _ => None,
    }
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?```$").unwrap());

/// Remove one outer Markdown code fence and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    match RE_OUTER_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => trimmed,
    }
}

//! Response shape classifier.
//!
//! Models wrap their task list in different ways depending on prompt
//! revision and provider. Each known convention is one matcher; matchers are
//! tried in [`MATCHERS`] order and the first hit wins.
//!
//! | Order | Shape | Example |
//! |-------|-------|---------|
//! | 1 | tasks wrapper | `{"tasks": [...]}` |
//! | 2 | bare array | `[...]` |
//! | 3 | first array property | `{"items": [...], "meta": {}}` |
//!
//! Empty arrays never match: a run must yield at least one task, so an
//! empty list is left for the fallback path.

use serde_json::Value;

/// Which matcher recognised the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    TasksWrapper,
    BareArray,
    FirstArrayProperty,
}

/// A recognised task array, borrowed from the parsed reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedArray<'a> {
    pub kind: ShapeKind,
    /// Property the array came from, for object shapes.
    pub key: Option<&'a str>,
    pub items: &'a [Value],
}

/// Outcome of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification<'a> {
    Matched(MatchedArray<'a>),
    Unrecognized,
}

/// A single shape probe: the matched array, or `None`.
pub type ShapeMatcher = for<'a> fn(&'a Value) -> Option<MatchedArray<'a>>;

/// Matchers in priority order.
pub const MATCHERS: [ShapeMatcher; 3] = [
    match_tasks_wrapper,
    match_bare_array,
    match_first_array_property,
];

/// Run the matchers in order over a parsed reply.
pub fn classify(value: &Value) -> Classification<'_> {
    MATCHERS
        .iter()
        .find_map(|matcher| matcher(value))
        .map_or(Classification::Unrecognized, Classification::Matched)
}

/// `{"tasks": [...]}` with a non-empty array.
pub fn match_tasks_wrapper(value: &Value) -> Option<MatchedArray<'_>> {
    let items = value
        .get("tasks")?
        .as_array()
        .filter(|a| !a.is_empty())?;
    Some(MatchedArray {
        kind: ShapeKind::TasksWrapper,
        key: Some("tasks"),
        items,
    })
}

/// A non-empty top-level array.
pub fn match_bare_array(value: &Value) -> Option<MatchedArray<'_>> {
    let items = value.as_array().filter(|a| !a.is_empty())?;
    Some(MatchedArray {
        kind: ShapeKind::BareArray,
        key: None,
        items,
    })
}

/// The first property (in document order) holding a non-empty array.
pub fn match_first_array_property(value: &Value) -> Option<MatchedArray<'_>> {
    value.as_object()?.iter().find_map(|(key, v)| {
        v.as_array()
            .filter(|a| !a.is_empty())
            .map(|items| MatchedArray {
                kind: ShapeKind::FirstArrayProperty,
                key: Some(key.as_str()),
                items,
            })
    })
}

/// Short JSON type name, for diagnostics.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

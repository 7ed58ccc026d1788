//! Output types: the canonical task record and the per-run result.

use serde::{Deserialize, Serialize};

/// Priority assigned to every task. The model is not asked for one.
pub const DEFAULT_PRIORITY: u8 = 3;

/// Classification of a task. Not populated by the normaliser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskCategory {
    #[serde(rename = "UI Design")]
    UiDesign,
    #[serde(rename = "UI Development")]
    UiDevelopment,
    #[serde(rename = "Frontend Logic")]
    FrontendLogic,
    #[serde(rename = "Backend Development")]
    BackendDevelopment,
}

/// One functional feature extracted from a document.
///
/// `id` is `task-{n}` with `n` the 1-based position in the run; it is unique
/// within a run but not stable across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    /// Title-cased, never empty, never padded.
    pub title: String,
    pub description: String,
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<TaskCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    /// Consumed by the spreadsheet export when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
}

impl Task {
    /// Build a task at 1-based `position` with the default priority.
    pub fn new(position: usize, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: task_id(position),
            title: title.into(),
            description: description.into(),
            priority: DEFAULT_PRIORITY,
            category: None,
            dependencies: None,
            estimated_time: None,
        }
    }
}

/// `task-{position}`.
pub fn task_id(position: usize) -> String {
    format!("task-{position}")
}

/// The result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub tasks: Vec<Task>,
    pub summary: String,
}

impl AnalysisResult {
    /// Wrap `tasks` with the derived `"Found {N} tasks."` summary.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let summary = format!("Found {} tasks.", tasks.len());
        Self { tasks, summary }
    }
}

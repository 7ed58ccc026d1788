//! Progress reporting for analysis runs.
//!
//! A run moves through fixed stages, each announced once:
//!
//! ```text
//! START(0) ─▶ EXTRACTING(10) ─▶ PROCESSING(20) ─▶ COMPLETE(100)
//!               (files only)      (inference + normalisation)
//! ```
//!
//! Two ways to observe them:
//!
//! * [`AnalysisProgressCallback`]: injected via
//!   [`crate::config::AnalysisConfigBuilder::progress_callback`] for the
//!   eager [`crate::analyze::analyze`].
//! * [`ProgressEvent`]: the ordered event sequence produced by
//!   [`crate::stream::analyze_stream`], ending in exactly one `complete` or
//!   `error` event.
//!
//! # Example
//!
//! ```rust
//! use doc2tasks::{AnalysisConfig, AnalysisProgressCallback};
//! use std::sync::{Arc, Mutex};
//!
//! struct Log(Mutex<Vec<u8>>);
//!
//! impl AnalysisProgressCallback for Log {
//!     fn on_progress(&self, percent: u8, _message: &str) {
//!         self.0.lock().unwrap().push(percent);
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(Log(Mutex::new(Vec::new()))))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::AnalysisError;
use crate::output::AnalysisResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A pipeline stage with its fixed percentage and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Extracting,
    Processing,
    Complete,
}

impl Stage {
    pub fn percent(self) -> u8 {
        match self {
            Stage::Start => 0,
            Stage::Extracting => 10,
            Stage::Processing => 20,
            Stage::Complete => 100,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Stage::Start => "Starting analysis...",
            Stage::Extracting => "Extracting text from document...",
            Stage::Processing => "Processing document...",
            Stage::Complete => "Analysis complete!",
        }
    }
}

/// Called by the orchestrator as a run advances.
///
/// Implementations must be `Send + Sync`; runs may execute concurrently on
/// the Tokio pool. Default implementations are no-ops.
pub trait AnalysisProgressCallback: Send + Sync {
    /// A stage was entered.
    fn on_progress(&self, percent: u8, message: &str) {
        let _ = (percent, message);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

/// One item of the progress stream.
///
/// Serialises to the `type`-tagged JSON used on the wire:
/// `{"type":"progress","progress":20,"message":"..."}`,
/// `{"type":"complete","result":{...}}`,
/// `{"type":"error","error":"...","category":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    Progress { progress: u8, message: String },
    Complete { result: AnalysisResult },
    Error { error: String, category: String },
}

impl ProgressEvent {
    pub fn stage(stage: Stage) -> Self {
        ProgressEvent::Progress {
            progress: stage.percent(),
            message: stage.message().to_string(),
        }
    }

    pub fn failed(err: &AnalysisError) -> Self {
        ProgressEvent::Error {
            error: err.to_string(),
            category: err.category().to_string(),
        }
    }

    /// `true` for `complete` and `error`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Progress { .. })
    }
}

/// Emit a stage through a callback.
pub(crate) fn report(cb: &dyn AnalysisProgressCallback, stage: Stage) {
    cb.on_progress(stage.percent(), stage.message());
}

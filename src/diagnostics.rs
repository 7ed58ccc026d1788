//! Diagnostics sink for non-fatal normalisation anomalies.
//!
//! The normaliser never logs on its own. Every recovered problem (bad JSON,
//! unknown reply shape, an item without a title) is handed to a
//! [`DiagnosticSink`], which keeps the decoder pure and lets tests assert on
//! exactly what was recovered.
//!
//! # Example
//!
//! ```rust
//! use doc2tasks::diagnostics::CollectingSink;
//! use doc2tasks::normalize::normalize_response;
//!
//! let sink = CollectingSink::default();
//! let tasks = normalize_response(r#"[{"description": "no title"}]"#, &sink);
//! assert_eq!(tasks[0].title, "Task 1");
//! assert_eq!(sink.anomalies().len(), 1);
//! ```

use crate::error::Anomaly;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Receives anomalies recovered by the normaliser.
///
/// `Send + Sync` so one sink can be shared by concurrent runs.
pub trait DiagnosticSink: Send + Sync {
    fn on_anomaly(&self, anomaly: &Anomaly) {
        let _ = anomaly;
    }
}

/// Discards everything.
pub struct NoopSink;

impl DiagnosticSink for NoopSink {}

/// Logs each anomaly at WARN. The default sink.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn on_anomaly(&self, anomaly: &Anomaly) {
        warn!(target: "doc2tasks::normalize", "{}", anomaly);
    }
}

/// Keeps every anomaly in memory, in arrival order.
#[derive(Default)]
pub struct CollectingSink {
    seen: Mutex<Vec<Anomaly>>,
}

impl CollectingSink {
    /// Snapshot of the anomalies recorded so far.
    pub fn anomalies(&self) -> Vec<Anomaly> {
        self.seen.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl DiagnosticSink for CollectingSink {
    fn on_anomaly(&self, anomaly: &Anomaly) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(anomaly.clone());
        }
    }
}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type SharedSink = Arc<dyn DiagnosticSink>;

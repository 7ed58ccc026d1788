//! # doc2tasks
//!
//! Turn a product or system description (PDF, DOCX, plain text, or a raw
//! string) into a list of structured feature tasks using an LLM.
//!
//! ## Why this crate?
//!
//! Asking a model for "a JSON array of tasks" does not get you one reliably.
//! Replies come back fenced in Markdown, wrapped in `{"tasks": [...]}`,
//! nested under an arbitrary key, as bare strings, or not as JSON at all.
//! This crate owns that mess: every reply, however broken, is normalised into
//! a non-empty list of [`Task`] records, and every deviation is reported as a
//! typed [`Anomaly`] instead of an error.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document / text
//!  │
//!  ├─ 1. Extract    PDF (pdfium) · DOCX (zip + XML) · text   (files only)
//!  ├─ 2. Infer      one chat completion via edgequake-llm
//!  ├─ 3. Normalise  fences → JSON → shape match → task mapping / fallback
//!  └─ 4. Output     AnalysisResult { tasks, summary }
//! ```
//!
//! Progress is reported at fixed stages (0, 10, 20, 100) either through a
//! callback ([`analyze`]) or as an event stream ([`analyze_stream`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2tasks::{analyze_file, AnalysisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let config = AnalysisConfig::default();
//!     let result = analyze_file("requirements.pdf", &config).await?;
//!     println!("{}", result.summary);
//!     doc2tasks::export_to_file(&result.tasks, Some("Backlog"), "tasks.xlsx").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2tasks` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doc2tasks = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_file, analyze_sync, analyze_with_cancel, AnalysisInput};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use diagnostics::{CollectingSink, DiagnosticSink, NoopSink, TracingSink};
pub use error::{AnalysisError, Anomaly, ExportError, ExtractionError, InferenceError};
pub use export::{export_to_file, sanitize_sheet_name, serialize_to_spreadsheet};
pub use normalize::{normalize_response, normalize_title};
pub use output::{AnalysisResult, Task, TaskCategory};
pub use pipeline::extract::{extract_text, DocumentFormat};
pub use pipeline::inference::{InferenceClient, ProviderInference};
pub use progress::{AnalysisProgressCallback, ProgressEvent, Stage};
pub use stream::{analyze_stream, EventStream};

//! Pipeline stages for document analysis.
//!
//! Each submodule wraps exactly one external collaborator so the
//! orchestrator can sequence them without knowing how they work.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ inference ──▶ crate::normalize
//! (pdfium/zip)  (LLM)         (JSON → tasks)
//! ```
//!
//! 1. [`extract`]: PDF / DOCX / text bytes to plain text; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 2. [`inference`]: one chat completion; the only stage with network I/O
//!    and the only suspension point of a run

pub mod extract;
pub mod inference;

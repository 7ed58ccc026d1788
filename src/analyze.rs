//! Eager (run-to-completion) analysis entry points.
//!
//! This module provides the simpler API: wait for the whole run, then return
//! the [`AnalysisResult`]. Use [`crate::stream::analyze_stream`] instead to
//! observe the run as an ordered event sequence.
//!
//! Both share [`run`], the single sequential orchestrator:
//! extraction (files only) → inference → normalisation. Only extraction and
//! inference can fail a run; every reply problem is absorbed by
//! [`crate::normalize`].

use crate::config::AnalysisConfig;
use crate::diagnostics::{SharedSink, TracingSink};
use crate::error::{AnalysisError, ExtractionError, InferenceError};
use crate::normalize::normalize_response;
use crate::output::AnalysisResult;
use crate::pipeline::extract::{extract_text_async, read_document};
use crate::pipeline::inference::{InferenceClient, ProviderInference};
use crate::progress::{report, AnalysisProgressCallback, NoopProgressCallback, Stage};
use crate::prompts::{build_user_prompt, DEFAULT_SYSTEM_PROMPT};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What to analyse: an uploaded document or raw text.
#[derive(Debug, Clone)]
pub enum AnalysisInput {
    /// Document bytes with their MIME type (PDF, DOCX or `text/plain`).
    Document { bytes: Vec<u8>, mime: String },
    /// Text sent to the model as-is; extraction is skipped.
    Text(String),
}

impl AnalysisInput {
    pub fn document(bytes: impl Into<Vec<u8>>, mime: impl Into<String>) -> Self {
        AnalysisInput::Document {
            bytes: bytes.into(),
            mime: mime.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        AnalysisInput::Text(text.into())
    }

    /// Read a local file, inferring the MIME type from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let (bytes, mime) = read_document(path.as_ref()).await?;
        Ok(AnalysisInput::document(bytes, mime))
    }
}

/// Analyse a document or text and return the normalised tasks.
///
/// # Errors
/// Returns `Err(AnalysisError)` only for fatal errors:
/// - no input text, unsupported or unreadable document
/// - inference failure (auth, quota, invalid model, timeout)
///
/// A malformed or oddly shaped model reply is never an error; the result
/// then holds a single fallback task.
///
/// # Example
/// ```rust,no_run
/// use doc2tasks::{analyze, AnalysisConfig, AnalysisInput};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AnalysisConfig::default();
/// let result = analyze(AnalysisInput::text("A marketplace for used bikes"), &config).await?;
/// for task in &result.tasks {
///     println!("{}: {}", task.id, task.title);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn analyze(
    input: AnalysisInput,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    analyze_with_cancel(input, config, &CancellationToken::new()).await
}

/// [`analyze`] with a token that aborts the in-flight inference call.
pub async fn analyze_with_cancel(
    input: AnalysisInput,
    config: &AnalysisConfig,
    cancel: &CancellationToken,
) -> Result<AnalysisResult, AnalysisError> {
    let progress: Arc<dyn AnalysisProgressCallback> = config
        .progress_callback
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgressCallback));
    run(input, config, cancel, progress.as_ref()).await
}

/// Read and analyse a local PDF, DOCX or text file.
pub async fn analyze_file(
    path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    let input = AnalysisInput::from_path(path).await?;
    analyze(input, config).await
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    input: AnalysisInput,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AnalysisError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(input, config))
}

/// The orchestrator shared by the eager and streaming APIs.
pub(crate) async fn run(
    input: AnalysisInput,
    config: &AnalysisConfig,
    cancel: &CancellationToken,
    progress: &dyn AnalysisProgressCallback,
) -> Result<AnalysisResult, AnalysisError> {
    let total_start = Instant::now();

    if let AnalysisInput::Text(ref text) = input {
        if text.is_empty() {
            return Err(AnalysisError::NoInput);
        }
    }

    report(progress, Stage::Start);

    // ── Step 1: Extract text ─────────────────────────────────────────────
    let text = match input {
        AnalysisInput::Document { bytes, mime } => {
            report(progress, Stage::Extracting);
            if bytes.len() > config.max_document_bytes {
                return Err(ExtractionError::DocumentTooLarge {
                    size: bytes.len(),
                    limit: config.max_document_bytes,
                }
                .into());
            }
            info!("Extracting text from {} bytes ({})", bytes.len(), mime);
            extract_text_async(bytes, mime).await?
        }
        AnalysisInput::Text(text) => text,
    };
    debug!("Document text: {} chars", text.len());

    // ── Step 2: Inference ────────────────────────────────────────────────
    report(progress, Stage::Processing);
    let inference = resolve_inference(config);
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let user_prompt = build_user_prompt(&text);

    let llm_start = Instant::now();
    let raw = call_inference(
        inference.as_ref(),
        system_prompt,
        &user_prompt,
        config,
        cancel,
    )
    .await?;
    info!(
        "Model replied with {} chars in {}ms",
        raw.len(),
        llm_start.elapsed().as_millis()
    );
    if raw.trim().is_empty() {
        warn!("Model reply is empty; falling back to a synthesised task");
    }

    // ── Step 3: Normalise ────────────────────────────────────────────────
    let sink: SharedSink = config
        .diagnostics
        .clone()
        .unwrap_or_else(|| Arc::new(TracingSink));
    let tasks = normalize_response(&raw, sink.as_ref());
    let result = AnalysisResult::from_tasks(tasks);

    report(progress, Stage::Complete);
    info!(
        "Analysis complete: {} tasks in {}ms",
        result.tasks.len(),
        total_start.elapsed().as_millis()
    );
    Ok(result)
}

/// Use the configured client, or build a provider-backed one.
fn resolve_inference(config: &AnalysisConfig) -> Arc<dyn InferenceClient> {
    match config.inference {
        Some(ref client) => Arc::clone(client),
        None => Arc::new(ProviderInference::from_config(config)),
    }
}

/// Run the completion under the configured timeout, racing `cancel`.
async fn call_inference(
    inference: &dyn InferenceClient,
    system_prompt: &str,
    user_prompt: &str,
    config: &AnalysisConfig,
    cancel: &CancellationToken,
) -> Result<String, InferenceError> {
    if cancel.is_cancelled() {
        return Err(InferenceError::Cancelled);
    }

    let secs = config.api_timeout_secs;
    let call = tokio::time::timeout(
        Duration::from_secs(secs),
        inference.complete(system_prompt, user_prompt, &config.model),
    );

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("Inference call cancelled");
            Err(InferenceError::Cancelled)
        }
        outcome = call => match outcome {
            Ok(reply) => reply,
            Err(_) => Err(InferenceError::Timeout { secs }),
        },
    }
}

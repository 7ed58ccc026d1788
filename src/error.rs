//! Error types for the doc2tasks library.
//!
//! Two distinct families reflect two distinct failure modes:
//!
//! * [`AnalysisError`]: **Fatal**: the run cannot produce a result at all
//!   (unreadable document, inference call failed, bad configuration).
//!   Returned as `Err(AnalysisError)` from [`crate::analyze::analyze`] and
//!   surfaced as the terminal `error` event by [`crate::stream::analyze_stream`].
//!
//! * [`Anomaly`]: **Non-fatal**: the model reply was malformed, had an
//!   unknown shape, or one array element lacked a field. These are absorbed
//!   by the normaliser and reported through a
//!   [`crate::diagnostics::DiagnosticSink`], so a run always yields tasks.

use edgequake_llm::LlmError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use thiserror::Error;

/// The source document could not be turned into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// MIME type is not PDF, DOCX or plain text.
    #[error("Unsupported file type: {mime}\nOnly PDF, DOCX, and TXT files are allowed.")]
    UnsupportedFormat { mime: String },

    /// The document exceeds the configured size limit.
    #[error("Document is {size} bytes, larger than the {limit} byte limit")]
    DocumentTooLarge { size: usize, limit: usize },

    /// The bytes do not decode as the declared format.
    #[error("{format} document is corrupt: {detail}")]
    CorruptDocument { format: &'static str, detail: String },

    /// pdfium could not be downloaded or bound.
    #[error(
        "PDF engine unavailable: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
    )]
    PdfEngineUnavailable(String),

    /// The input file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The inference call failed. No retries are attempted.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Quota exhausted or rate limit hit.
    #[error("LLM API quota exceeded or rate limit reached. Please try again later. ({detail})")]
    QuotaExceeded { detail: String },

    /// The API key was rejected.
    #[error("LLM API key is invalid or missing. Please check your configuration. ({detail})")]
    AuthFailed { detail: String },

    /// The provider does not know the requested model.
    #[error("Invalid model ID: {model}. Please check your configuration.")]
    InvalidModel { model: String },

    /// The call did not finish within `api_timeout_secs`.
    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The caller cancelled the run while the call was in flight.
    #[error("Analysis cancelled")]
    Cancelled,

    /// Any other provider failure.
    #[error("Failed to analyze document with AI: {detail}")]
    Failed { detail: String },
}

impl InferenceError {
    /// Map a provider error, using its variant when it is specific enough.
    pub fn from_provider(err: &LlmError, model: &str) -> Self {
        match err {
            LlmError::AuthError(detail) => InferenceError::AuthFailed {
                detail: detail.clone(),
            },
            LlmError::RateLimited(detail) => InferenceError::QuotaExceeded {
                detail: detail.clone(),
            },
            LlmError::ModelNotFound(_) => InferenceError::InvalidModel {
                model: model.to_string(),
            },
            other => Self::classify(&other.to_string(), model),
        }
    }

    /// Classify a raw provider failure message into a user-facing error.
    ///
    /// Checked in order: API key, quota / rate limit, model. Status codes
    /// only count next to `HTTP` / `status` / `code` or their reason phrase.
    pub fn classify(message: &str, model: &str) -> Self {
        let lower = message.to_lowercase();
        let status = http_status(&lower);
        if lower.contains("api key") || status == Some(401) {
            InferenceError::AuthFailed {
                detail: message.to_string(),
            }
        } else if lower.contains("quota") || lower.contains("rate limit") || status == Some(429) {
            InferenceError::QuotaExceeded {
                detail: message.to_string(),
            }
        } else if lower.contains("model") {
            InferenceError::InvalidModel {
                model: model.to_string(),
            }
        } else {
            InferenceError::Failed {
                detail: message.to_string(),
            }
        }
    }
}

static RE_HTTP_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:http|status(?:\s+code)?|code|error)\s*[:=]?\s*(\d{3})\b|\b(401|429)\s+(?:unauthorized|too many requests)\b",
    )
    .unwrap()
});

/// HTTP status named in a lower-cased provider message, if any.
fn http_status(lower: &str) -> Option<u16> {
    let caps = RE_HTTP_STATUS.captures(lower)?;
    caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok()
}

/// Tasks could not be written to a spreadsheet.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Empty list, or a task with an empty id / title / description.
    #[error("Invalid tasks data: {reason}")]
    InvalidTasks { reason: String },

    /// The workbook writer failed.
    #[error("Failed to build workbook: {0}")]
    Workbook(String),

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// All fatal errors returned by the doc2tasks library.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Neither a document nor text was supplied.
    #[error("No document or text provided")]
    NoInput,

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Export(#[from] ExportError),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// Stable machine-readable category, carried on the terminal error event.
    pub fn category(&self) -> &'static str {
        match self {
            AnalysisError::NoInput => "no_input",
            AnalysisError::Extraction(_) => "extraction",
            AnalysisError::Inference(InferenceError::QuotaExceeded { .. }) => "quota_exceeded",
            AnalysisError::Inference(InferenceError::AuthFailed { .. })
            | AnalysisError::Inference(InferenceError::ProviderNotConfigured { .. }) => "auth",
            AnalysisError::Inference(InferenceError::Cancelled) => "cancelled",
            AnalysisError::Inference(InferenceError::Timeout { .. }) => "timeout",
            AnalysisError::Inference(_) => "inference",
            AnalysisError::Export(_) => "export",
            AnalysisError::InvalidConfig(_) => "config",
            AnalysisError::Internal(_) => "internal",
        }
    }
}

/// A non-fatal problem found while normalising a model reply.
///
/// Reported to a [`crate::diagnostics::DiagnosticSink`]; the normaliser
/// substitutes defaults and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "anomaly", rename_all = "snake_case")]
pub enum Anomaly {
    /// The reply is not valid JSON.
    #[error("response is not valid JSON: {detail}")]
    MalformedResponse { detail: String },

    /// Valid JSON, but no array of tasks could be located.
    #[error("no task array found in a {kind} response")]
    UnrecognizedShape { kind: String },

    /// A `tasks` field (or the top-level array) was present but empty.
    #[error("'{field}' array is empty")]
    EmptyArray { field: String },

    /// Object item without any usable title field.
    #[error("item {index}: no task, title, name or id field")]
    MissingTitle { index: usize },

    /// Object item without any usable description field.
    #[error("item {index}: no description, desc or details field")]
    MissingDescription { index: usize },

    /// Title field present but nothing left after normalisation.
    #[error("item {index}: title is blank after normalisation")]
    UnusableTitle { index: usize },

    /// Item is neither a string nor an object.
    #[error("item {index}: expected string or object, got {kind}")]
    NonObjectItem { index: usize, kind: String },
}

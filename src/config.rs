//! Configuration types for document analysis.
//!
//! All run behaviour is controlled through [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]. One struct holds every knob so a config can be
//! shared across concurrent runs (it is `Clone` and holds only `Arc`s).

use crate::diagnostics::SharedSink;
use crate::error::AnalysisError;
use crate::pipeline::inference::InferenceClient;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Largest document accepted for extraction (10 MiB).
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Configuration for an analysis run.
///
/// # Example
/// ```rust
/// use doc2tasks::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .model("gpt-4.1-mini")
///     .temperature(0.2)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gpt-4.1-mini");
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// LLM model identifier passed to the inference collaborator. Default: `gpt-4`.
    pub model: String,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`
    /// and always talks to its own model.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed inference client. Takes precedence over everything
    /// provider-related; used to plug in non-edgequake backends and fakes.
    pub inference: Option<Arc<dyn InferenceClient>>,

    /// Sampling temperature. Default: 0.7.
    ///
    /// Higher than a transcription task would use: the prompt asks the model
    /// to fill in expected features, not only to copy what is written.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 2000.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Documents above this size are rejected before extraction. Default: 10 MiB.
    pub max_document_bytes: usize,

    /// Timeout for the inference call in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Receives stage updates during [`crate::analyze::analyze`].
    pub progress_callback: Option<ProgressCallback>,

    /// Receives normalisation anomalies. Default: [`crate::diagnostics::TracingSink`].
    pub diagnostics: Option<SharedSink>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            provider: None,
            inference: None,
            temperature: 0.7,
            max_tokens: 2000,
            system_prompt: None,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            api_timeout_secs: 120,
            progress_callback: None,
            diagnostics: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("inference", &self.inference.as_ref().map(|_| "<dyn InferenceClient>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("max_document_bytes", &self.max_document_bytes)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    /// Use a pre-built provider. Its model becomes the configured model,
    /// since a built provider cannot be re-pointed at another one.
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.model = provider.model().to_string();
        self.config.provider = Some(provider);
        self
    }

    pub fn inference(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.config.inference = Some(client);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_document_bytes(mut self, n: usize) -> Self {
        self.config.max_document_bytes = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn diagnostics(mut self, sink: SharedSink) -> Self {
        self.config.diagnostics = Some(sink);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, AnalysisError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(AnalysisError::InvalidConfig("Model must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(AnalysisError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.max_document_bytes == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max_document_bytes must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(AnalysisError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

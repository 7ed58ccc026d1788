//! Inference: send the extraction prompt to an LLM and return its raw reply.
//!
//! The orchestrator only depends on [`InferenceClient`], so any backend (or a
//! test fake) can be plugged in through
//! [`crate::config::AnalysisConfigBuilder::inference`]. The default
//! implementation, [`ProviderInference`], drives an `edgequake-llm` provider.
//!
//! No retries happen here: one failed call fails the run.

use crate::config::AnalysisConfig;
use crate::error::InferenceError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A chat-completion backend.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Run one completion and return the reply text verbatim.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
    ) -> Result<String, InferenceError>;
}

/// [`InferenceClient`] backed by an `edgequake-llm` provider.
#[derive(Clone)]
pub struct ProviderInference {
    provider: Option<Arc<dyn LLMProvider>>,
    provider_name: Option<String>,
    temperature: f32,
    max_tokens: usize,
}

impl ProviderInference {
    /// Take provider settings and sampling options from `config`.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            provider_name: config.provider_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl InferenceClient for ProviderInference {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
    ) -> Result<String, InferenceError> {
        let provider = resolve_provider(self.provider.as_ref(), self.provider_name.as_deref(), model)?;
        let sent_model = provider.model().to_string();
        let messages = vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)];
        let options = self.options();

        info!("Sending {} chars to {} model {}", user_prompt.len(), provider.name(), sent_model);
        let start = Instant::now();
        match provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "{} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                Ok(response.content)
            }
            Err(e) => {
                warn!("Inference call failed after {:?}: {}", start.elapsed(), e);
                Err(InferenceError::from_provider(&e, &sent_model))
            }
        }
    }
}

/// Resolve the LLM provider for `model`, from most-specific to least-specific.
///
/// 1. **Pre-built provider**: used as-is; it was built for its own model
///    ([`crate::config::AnalysisConfigBuilder::provider`] copies that model
///    into the config).
/// 2. **Named provider**: `ProviderFactory::create_llm_provider(name, model)`,
///    which reads the matching API key from the environment.
/// 3. **`EDGEQUAKE_LLM_PROVIDER`**: picks the provider; the model is still `model`.
/// 4. **OpenAI key**: `OPENAI_API_KEY` selects OpenAI.
/// 5. **Full auto-detection**: `ProviderFactory::from_env` picks the
///    provider, which is rebuilt for `model` when its default differs.
fn resolve_provider(
    provider: Option<&Arc<dyn LLMProvider>>,
    provider_name: Option<&str>,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, InferenceError> {
    resolve_provider_with(provider, provider_name, model, |key| std::env::var(key).ok())
}

fn resolve_provider_with(
    provider: Option<&Arc<dyn LLMProvider>>,
    provider_name: Option<&str>,
    model: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn LLMProvider>, InferenceError> {
    if let Some(provider) = provider {
        if provider.model() != model {
            warn!(
                "Pre-built {} provider is bound to model {}; requested {} is not applied",
                provider.name(),
                provider.model(),
                model
            );
        }
        return Ok(Arc::clone(provider));
    }

    if let Some(name) = provider_name {
        return create_provider(name, model);
    }

    if let Some(name) = env("EDGEQUAKE_LLM_PROVIDER").filter(|p| !p.is_empty()) {
        return create_provider(&name, model);
    }

    if env("OPENAI_API_KEY").is_some_and(|k| !k.is_empty()) {
        return create_provider("openai", model);
    }

    let (detected, _embedding) =
        ProviderFactory::from_env().map_err(|e| InferenceError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    if detected.model() == model {
        return Ok(detected);
    }
    debug!("Auto-detected {} provider; rebinding to model {}", detected.name(), model);
    create_provider(detected.name(), model)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, InferenceError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        InferenceError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgequake_llm::MockProvider;
    use std::collections::HashMap;

    #[test]
    fn options_follow_config() {
        let config = AnalysisConfig::builder()
            .temperature(0.3)
            .max_tokens(512)
            .build()
            .unwrap();
        let opts = ProviderInference::from_config(&config).options();
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, Some(512));
    }

    fn fake_env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn env_provider_uses_requested_model() {
        let env = fake_env(&[
            ("EDGEQUAKE_LLM_PROVIDER", "ollama"),
            ("EDGEQUAKE_MODEL", "env-model"),
        ]);
        let provider = resolve_provider_with(None, None, "llama3.1:8b", env).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "llama3.1:8b");
    }

    #[test]
    fn named_provider_uses_requested_model() {
        let provider = resolve_provider_with(None, Some("ollama"), "qwen2.5", fake_env(&[])).unwrap();
        assert_eq!(provider.model(), "qwen2.5");
    }

    #[test]
    fn unknown_provider_name_is_not_configured() {
        let err = resolve_provider_with(None, Some("nope"), "gpt-4", fake_env(&[]))
            .err()
            .unwrap();
        assert!(matches!(err, InferenceError::ProviderNotConfigured { .. }));
    }

    #[test]
    fn prebuilt_provider_is_used_as_is() {
        let mock: Arc<dyn LLMProvider> = Arc::new(MockProvider::new());
        let provider = resolve_provider_with(Some(&mock), Some("ollama"), "gpt-4", fake_env(&[])).unwrap();
        assert_eq!(provider.name(), "mock");
    }

    #[test]
    fn default_options_match_analysis_defaults() {
        let opts = ProviderInference::from_config(&AnalysisConfig::default()).options();
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.max_tokens, Some(2000));
    }
}

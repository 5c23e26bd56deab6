//! Provider lookup by configuration key.

use crate::client::OllamaClient;
use crate::error::{LlmError, LlmResult};
use crate::openai::OpenAiClient;
use crate::provider::LlmProvider;
use sieve_config::LlmConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Builds a provider from the `[llm]` config section.
pub type ProviderConstructor = fn(&LlmConfig) -> LlmResult<Arc<dyn LlmProvider>>;

/// Maps `llm.provider` keys to constructors. Populated once at startup.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    constructors: HashMap<String, ProviderConstructor>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `ollama` and `openai` providers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("ollama", |config| {
            Ok(Arc::new(OllamaClient::from_config(config)?) as Arc<dyn LlmProvider>)
        });
        registry.register("openai", |config| {
            Ok(Arc::new(OpenAiClient::from_config(config)?) as Arc<dyn LlmProvider>)
        });
        registry
    }

    /// Register (or replace) a constructor. Keys are case-insensitive.
    pub fn register(&mut self, name: &str, constructor: ProviderConstructor) {
        self.constructors.insert(name.to_lowercase(), constructor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(&name.to_lowercase())
    }

    /// Sorted list of registered keys.
    pub fn list_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Instantiate the provider named by `config.provider`.
    pub fn create(&self, config: &LlmConfig) -> LlmResult<Arc<dyn LlmProvider>> {
        let name = config.provider.trim().to_lowercase();
        let constructor = self.constructors.get(&name).ok_or_else(|| {
            let available = self.list_providers();
            LlmError::UnknownProvider {
                name: name.clone(),
                available: if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                },
            }
        })?;

        let provider = constructor(config)?;
        info!("Using LLM provider '{}' with model {}", name, config.model);
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LlmResponse;
    use async_trait::async_trait;

    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str) -> LlmResult<LlmResponse> {
            Ok(LlmResponse::new(prompt, "echo-1"))
        }
    }

    #[test]
    fn test_defaults_registered() {
        let registry = ProviderRegistry::with_defaults();
        assert_eq!(registry.list_providers(), vec!["ollama", "openai"]);
        assert!(registry.contains("Ollama"));
    }

    #[test]
    fn test_create_default_ollama() {
        let registry = ProviderRegistry::with_defaults();
        let provider = registry.create(&LlmConfig::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn test_unknown_provider() {
        let registry = ProviderRegistry::with_defaults();
        let config = LlmConfig {
            provider: "deepseek".to_string(),
            ..LlmConfig::default()
        };

        match registry.create(&config) {
            Err(LlmError::UnknownProvider { name, available }) => {
                assert_eq!(name, "deepseek");
                assert_eq!(available, "ollama, openai");
            }
            other => panic!("expected UnknownProvider, got {:?}", other.map(|p| p.name().to_string())),
        }
    }

    #[tokio::test]
    async fn test_custom_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register("ECHO", |_| Ok(Arc::new(EchoProvider) as Arc<dyn LlmProvider>));

        let config = LlmConfig {
            provider: "echo".to_string(),
            ..LlmConfig::default()
        };
        let provider = registry.create(&config).unwrap();
        let response = provider.generate("ping").await.unwrap();
        assert_eq!(response.text, "ping");
        assert_eq!(response.model, "echo-1");
    }
}

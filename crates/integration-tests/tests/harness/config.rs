//! Programmatic configuration builder for integration tests

use secrecy::SecretString;
use scholar_config::{Config, LlmProviderConfig, LlmProviderType, ModelFilter, RetrievalConfig};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default chat settings and no providers
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Add an Anthropic provider pointed at a mock vendor
    pub fn with_anthropic_provider(self, name: &str, base_url: &str, include: &[&str]) -> Self {
        self.with_provider(name, LlmProviderType::Anthropic, base_url, include)
    }

    /// Add a Google provider pointed at a mock vendor
    pub fn with_google_provider(self, name: &str, base_url: &str, include: &[&str]) -> Self {
        self.with_provider(name, LlmProviderType::Google, base_url, include)
    }

    fn with_provider(mut self, name: &str, provider_type: LlmProviderType, base_url: &str, include: &[&str]) -> Self {
        self.config.llm.providers.insert(
            name.to_owned(),
            LlmProviderConfig {
                provider_type,
                api_key: Some(SecretString::from("test-key")),
                base_url: Some(base_url.parse().expect("valid URL")),
                models: ModelFilter {
                    include: include.iter().map(|&p| p.to_owned()).collect(),
                    exclude: Vec::new(),
                },
            },
        );
        self
    }

    /// Point retrieval at a mock search service
    pub fn with_retrieval(mut self, endpoint: &str) -> Self {
        self.config.retrieval = Some(RetrievalConfig {
            endpoint: endpoint.parse().expect("valid URL"),
            api_key: Some(SecretString::from("search-key")),
            documents: 5,
            threshold: 0.2,
        });
        self
    }

    /// Override the system prompt
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        prompt.clone_into(&mut self.config.chat.system_prompt);
        self
    }

    /// Build and validate the final config
    pub fn build(self) -> Config {
        self.config.validate().expect("valid test config");
        self.config
    }
}

//! Anthropic Messages API provider implementation

use async_trait::async_trait;
use reqwest::Client;
use scholar_config::LlmProviderConfig;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::ProviderAdapter;
use crate::error::LlmError;
use crate::protocol::anthropic::{AnthropicErrorResponse, AnthropicRequest, AnthropicResponse};
use crate::types::{NeutralTurn, TurnRequest};

/// Default Anthropic API base URL
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API provider
pub struct AnthropicProvider {
    name: String,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl AnthropicProvider {
    /// Create from provider configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if the base URL is invalid.
    pub fn new(name: String, config: &LlmProviderConfig) -> Result<Self, LlmError> {
        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL).map_err(|e| LlmError::Internal(e.into()))?,
        };

        Ok(Self {
            name,
            client: Client::new(),
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Build the messages endpoint URL
    fn messages_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/messages")
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    type WireRequest = AnthropicRequest;

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn translate_request(&self, request: &TurnRequest<'_>) -> Result<AnthropicRequest, LlmError> {
        Ok(request.into())
    }

    async fn send_and_parse(&self, wire: AnthropicRequest) -> Result<NeutralTurn, LlmError> {
        let mut builder = self
            .client
            .post(self.messages_url())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&wire);

        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(provider = %self.name, error = %e, "upstream request failed");
            LlmError::Upstream(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                provider = %self.name,
                status = %status,
                "upstream returned error"
            );

            let message = serde_json::from_str::<AnthropicErrorResponse>(&body).map_or(body, |e| e.error.message);
            return Err(LlmError::Upstream(format!("provider returned {status}: {message}")));
        }

        let wire_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Upstream(format!("failed to parse response: {e}")))?;

        tracing::debug!(
            provider = %self.name,
            stop_reason = wire_response.stop_reason.as_deref().unwrap_or("none"),
            "anthropic turn received"
        );

        Ok(wire_response.into())
    }
}

#[cfg(test)]
mod tests {
    use scholar_config::{LlmProviderType, ModelFilter};

    use super::*;
    use crate::types::{GenerationOptions, Message};

    fn config(base_url: Option<&str>) -> LlmProviderConfig {
        LlmProviderConfig {
            provider_type: LlmProviderType::Anthropic,
            api_key: None,
            base_url: base_url.map(|u| Url::parse(u).unwrap()),
            models: ModelFilter::default(),
        }
    }

    #[test]
    fn messages_url_uses_default_base() {
        let provider = AnthropicProvider::new("claude".to_owned(), &config(None)).unwrap();
        assert_eq!(provider.messages_url(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn messages_url_tolerates_trailing_slash() {
        let provider = AnthropicProvider::new("claude".to_owned(), &config(Some("http://localhost:9000/v1/"))).unwrap();
        assert_eq!(provider.messages_url(), "http://localhost:9000/v1/messages");
    }

    #[test]
    fn translation_carries_model_and_history() {
        let provider = AnthropicProvider::new("claude".to_owned(), &config(None)).unwrap();
        let history = vec![Message::user("hello")];
        let options = GenerationOptions::default();
        let request = TurnRequest {
            model: "claude-3-haiku",
            system_prompt: "sys",
            history: &history,
            tools: &[],
            options: &options,
        };

        let wire = provider.translate_request(&request).unwrap();

        assert_eq!(wire.model, "claude-3-haiku");
        assert_eq!(wire.messages.len(), 1);
        assert_eq!(provider.provider_name(), "claude");
    }
}

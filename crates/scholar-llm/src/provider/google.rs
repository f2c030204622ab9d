//! Google Generative Language API provider implementation

use async_trait::async_trait;
use reqwest::Client;
use scholar_config::LlmProviderConfig;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::ProviderAdapter;
use crate::error::LlmError;
use crate::protocol::google::{GoogleErrorResponse, GoogleRequest, GoogleResponse};
use crate::types::{NeutralTurn, TurnRequest};

/// Default Google Generative Language API base URL
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google request body plus the model it targets, which lives in the URL
pub struct GoogleWireRequest {
    model: String,
    body: GoogleRequest,
}

/// Google Generative Language API provider
pub struct GoogleProvider {
    name: String,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl GoogleProvider {
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

    /// Build the `generateContent` endpoint URL for a model
    fn generate_url(&self, model: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{base}/models/{model}:generateContent")
    }
}

#[async_trait]
impl ProviderAdapter for GoogleProvider {
    type WireRequest = GoogleWireRequest;

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn translate_request(&self, request: &TurnRequest<'_>) -> Result<GoogleWireRequest, LlmError> {
        Ok(GoogleWireRequest {
            model: request.model.to_owned(),
            body: request.into(),
        })
    }

    async fn send_and_parse(&self, wire: GoogleWireRequest) -> Result<NeutralTurn, LlmError> {
        let mut builder = self.client.post(self.generate_url(&wire.model)).json(&wire.body);

        if let Some(key) = &self.api_key {
            builder = builder.query(&[("key", key.expose_secret())]);
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

            let message = serde_json::from_str::<GoogleErrorResponse>(&body).map_or(body, |e| e.error.message);
            return Err(LlmError::Upstream(format!("provider returned {status}: {message}")));
        }

        let wire_response: GoogleResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Upstream(format!("failed to parse response: {e}")))?;

        if let Some(reason) = wire_response.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
            tracing::debug!(provider = %self.name, finish_reason = reason, "google turn received");
        }

        Ok(wire_response.into())
    }
}

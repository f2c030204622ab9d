//! Provider adapters and model-id based selection

pub mod anthropic;
pub mod bedrock;
pub mod google;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use scholar_config::{LlmConfig, LlmProviderType, ModelFilter};

use crate::error::LlmError;
use crate::routing::ModelRouter;
use crate::types::{NeutralTurn, TurnRequest};

/// Per-vendor translation between the neutral model and a wire protocol
///
/// One implementation per vendor. Translation is pure; only
/// [`send_and_parse`](Self::send_and_parse) touches the network.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Vendor-specific request, built fresh for every turn
    type WireRequest: Send;

    /// Configured provider name
    fn provider_name(&self) -> &str;

    /// Encode the full history, tools and options for the vendor
    fn translate_request(&self, request: &TurnRequest<'_>) -> Result<Self::WireRequest, LlmError>;

    /// Send the request and parse the reply into a neutral turn
    ///
    /// A reply with zero content parts parses to an empty turn; missing
    /// usage metadata parses to zero usage.
    async fn send_and_parse(&self, wire: Self::WireRequest) -> Result<NeutralTurn, LlmError>;
}

/// Object-safe view of an adapter, as held by the completion driver
#[async_trait]
pub trait Provider: Send + Sync {
    /// Configured provider name
    fn name(&self) -> &str;

    /// Run one turn: translate, send, parse
    async fn complete(&self, request: &TurnRequest<'_>) -> Result<NeutralTurn, LlmError>;
}

#[async_trait]
impl<T> Provider for T
where
    T: ProviderAdapter,
{
    fn name(&self) -> &str {
        self.provider_name()
    }

    async fn complete(&self, request: &TurnRequest<'_>) -> Result<NeutralTurn, LlmError> {
        let wire = self.translate_request(request)?;
        self.send_and_parse(wire).await
    }
}

/// All configured providers plus the router choosing between them
#[derive(Default)]
pub struct Providers {
    router: ModelRouter,
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl Providers {
    /// Build every provider named in the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a provider cannot be constructed or a model
    /// pattern does not compile
    pub async fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let mut providers = Self::default();

        for (name, provider_config) in &config.providers {
            let provider: Arc<dyn Provider> = match &provider_config.provider_type {
                LlmProviderType::Anthropic => {
                    Arc::new(anthropic::AnthropicProvider::new(name.clone(), provider_config)?)
                }
                LlmProviderType::Google => Arc::new(google::GoogleProvider::new(name.clone(), provider_config)?),
                LlmProviderType::Bedrock(_) => {
                    Arc::new(bedrock::BedrockProvider::new(name.clone(), provider_config).await?)
                }
            };

            providers.register(name, &provider_config.models, provider)?;
            tracing::debug!(provider = %name, "llm provider registered");
        }

        Ok(providers)
    }

    /// Add a provider; registration order is routing order
    ///
    /// # Errors
    ///
    /// Returns an error if a model pattern does not compile
    pub fn register(&mut self, name: &str, filter: &ModelFilter, provider: Arc<dyn Provider>) -> Result<(), LlmError> {
        self.router.add(name, filter)?;
        self.providers.insert(name.to_owned(), provider);
        Ok(())
    }

    /// Pick the provider serving `model` and the model id to send it
    ///
    /// # Errors
    ///
    /// Returns `ProviderNotFound` or `ModelNotFound` when nothing matches
    pub fn resolve(&self, model: &str) -> Result<(Arc<dyn Provider>, String), LlmError> {
        let resolved = self.router.resolve(model)?;

        let provider = self
            .providers
            .get(&resolved.provider_name)
            .cloned()
            .ok_or_else(|| LlmError::ProviderNotFound {
                provider: resolved.provider_name.clone(),
            })?;

        Ok((provider, resolved.model_id))
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

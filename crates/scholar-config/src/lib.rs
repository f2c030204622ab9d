#![allow(clippy::must_use_candidate)]

pub mod chat;
mod env;
pub mod llm;
mod loader;
pub mod retrieval;
pub mod telemetry;

use serde::Deserialize;

pub use chat::*;
pub use llm::*;
pub use retrieval::*;
pub use telemetry::TelemetryConfig;

/// Top-level scholar configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Chat defaults (system prompt, generation options)
    #[serde(default)]
    pub chat: ChatConfig,
    /// Evidence retrieval service
    #[serde(default)]
    pub retrieval: Option<RetrievalConfig>,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

//! Provider-neutral model access for scholar
//!
//! Defines the neutral conversation model the completion driver works on and
//! one adapter per vendor (Anthropic Messages, AWS Bedrock Converse, Google
//! Generative Language) translating it to and from the vendor wire protocol.
//! Adapters are picked by model id through [`Providers`].

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod routing;
pub mod types;

pub use error::LlmError;
pub use provider::{Provider, ProviderAdapter, Providers};
pub use routing::{ModelRouter, ResolvedModel};
pub use types::{
    Content, GenerationOptions, Message, NeutralTurn, Role, ToolInvocation, ToolOutcome, ToolResult, ToolSpec,
    TurnRequest, Usage,
};

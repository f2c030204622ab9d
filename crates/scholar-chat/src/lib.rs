//! Retrieval-grounded chat for scholar
//!
//! [`CompletionDriver`] runs the tool-calling loop against any
//! [`scholar_llm::Provider`]; [`ChatService`] wraps it with request
//! validation, thread persistence and usage accounting. Evidence comes from
//! the `get_sources` tool and is attributed back to named documents once the
//! model has answered.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod attribution;
pub mod driver;
pub mod error;
pub mod retrieval;
pub mod service;
pub mod sources;
pub mod store;
pub mod tools;

pub use attribution::{AttributedSource, SourceAttributor};
pub use driver::{CompletionDriver, CompletionRequest, CompletionResponse, MAX_TOOL_ROUNDS};
pub use error::{ChatError, RetrievalError, StoreError, ToolError};
pub use retrieval::{HttpRetrieval, Retrieval, RetrievalUsage, SearchQuery, SearchResponse};
pub use service::{
    ChatService, DirectCompletion, DirectCompletionReply, ModelOptions, PostMessage, PostMessageReply, RetrievalOptions,
};
pub use sources::{EvidenceItem, GET_SOURCES, GetSources, SourcesPayload};
pub use store::{Datastore, MemoryDatastore, ModelUsage, Thread};
pub use tools::{ToolHandler, ToolRegistry};

use http::StatusCode;
use scholar_core::HttpError;
use scholar_llm::LlmError;
use thiserror::Error;

/// Reasons a completion or a chat request fails
///
/// Every variant is fatal: the request is aborted and nothing is
/// persisted. Usage recording and source name lookups degrade silently
/// instead and never show up here.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Malformed options, ids or prompt, detected before the first turn
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The model asked for a tool that is not registered
    #[error("unknown tool: {tool}")]
    UnknownTool { tool: String },

    /// A registered tool handler failed
    #[error("tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// The model kept requesting tools past the round limit
    #[error("tool loop exceeded after {rounds} rounds")]
    ToolLoopExceeded { rounds: u32 },

    /// The vendor call failed or returned something unreadable
    #[error("provider error: {0}")]
    ProviderTransport(#[from] LlmError),

    /// A provider turn carried neither text nor tool calls
    #[error("model returned an empty response")]
    EmptyModelResponse,

    /// The caller cancelled before the completion finished
    #[error("completion cancelled")]
    Cancelled,

    /// Thread could not be loaded or stored
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl HttpError for ChatError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnknownTool { .. } | Self::EmptyModelResponse => StatusCode::BAD_GATEWAY,
            Self::ToolExecution { .. } | Self::ToolLoopExceeded { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ProviderTransport(e) => e.status_code(),
            Self::Cancelled => StatusCode::REQUEST_TIMEOUT,
            Self::Storage(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::UnknownTool { .. } => "unknown_tool",
            Self::ToolExecution { .. } => "tool_execution_error",
            Self::ToolLoopExceeded { .. } => "tool_loop_exceeded",
            Self::ProviderTransport(e) => e.error_type(),
            Self::EmptyModelResponse => "empty_model_response",
            Self::Cancelled => "cancelled",
            Self::Storage(StoreError::NotFound { .. }) => "not_found",
            Self::Storage(_) => "storage_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::ProviderTransport(e) => e.client_message(),
            Self::Storage(StoreError::Backend(_)) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}

/// Datastore failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record does not exist for this caller
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Backend failure
    #[error("datastore failure: {0}")]
    Backend(String),
}

/// Retrieval service failures
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// HTTP transport or decoding error
    #[error("retrieval request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Retrieval service returned a non-success status
    #[error("retrieval API error ({status}): {message}")]
    Api {
        /// HTTP status from the service
        status: u16,
        /// Error message from the response body
        message: String,
    },
}

/// Failure inside a tool handler
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments do not match the tool's parameter schema
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Evidence search failed
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// Result could not be serialized
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

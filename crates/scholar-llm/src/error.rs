use http::StatusCode;
use scholar_core::HttpError;
use thiserror::Error;

/// Errors that can occur while talking to a model provider
#[derive(Debug, Error)]
pub enum LlmError {
    /// No configured provider serves the requested model
    #[error("model not found: {model}")]
    ModelNotFound { model: String },

    /// Named provider does not exist in configuration
    #[error("provider not found: {provider}")]
    ProviderNotFound { provider: String },

    /// Vendor call failed, returned an error status, or sent an unreadable body
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The neutral request cannot be expressed in the vendor protocol
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ModelNotFound { .. } | Self::ProviderNotFound { .. } | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::ModelNotFound { .. } | Self::ProviderNotFound { .. } => "model_not_found",
            Self::Upstream(_) => "provider_transport_error",
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the authenticated caller a request runs on behalf of
///
/// Authentication happens upstream; by the time a value of this type
/// exists the caller has already been verified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    /// Wrap an already verified caller identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CallerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Runtime context for one chat request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Caller the request runs for
    pub caller: CallerId,
    /// Correlation id attached to every log line of the request
    pub request_id: Uuid,
}

impl RequestContext {
    /// Create a context with a fresh request id
    pub fn new(caller: impl Into<CallerId>) -> Self {
        Self {
            caller: caller.into(),
            request_id: Uuid::new_v4(),
        }
    }
}

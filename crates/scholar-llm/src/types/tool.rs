use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tool as advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name, unique within a request
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema for the arguments
    pub parameters: Value,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Provider-assigned (or synthesized) invocation id
    pub id: String,
    /// Name of the tool to run
    pub name: String,
    /// Arguments keyed by parameter name
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    /// Build an invocation, keeping only object-shaped arguments
    ///
    /// Vendors occasionally send `null` or a scalar for a call without
    /// arguments; those become an empty map.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Arguments as a JSON object value
    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone())
    }
}

/// Result paired with a prior invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the invocation this result answers
    pub invocation_id: String,
    /// Name of the tool that ran (some vendors key results by name)
    pub tool_name: String,
    /// Payload or failure marker
    pub outcome: ToolOutcome,
}

/// What a tool produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "content", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// JSON string produced by the handler
    Payload(String),
    /// The handler failed with this message
    Failure(String),
}

impl ToolResult {
    /// Successful result
    pub fn payload(invocation_id: impl Into<String>, tool_name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Payload(payload.into()),
        }
    }

    /// Failed result
    pub fn failure(invocation_id: impl Into<String>, tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Failure(message.into()),
        }
    }

    /// Whether this result carries a failure marker
    pub const fn is_failure(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Failure(_))
    }

    /// Payload or failure message as sent to the vendor
    pub fn content(&self) -> &str {
        match &self.outcome {
            ToolOutcome::Payload(text) | ToolOutcome::Failure(text) => text,
        }
    }
}

use serde::{Deserialize, Serialize};

use super::tool::{ToolInvocation, ToolResult};

/// Role of a message participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Tool result
    Tool,
}

/// Message in a turn history
///
/// Histories are append-only; constructors pick the role that matches the
/// content so the two cannot disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author
    pub role: Role,
    /// Message content
    pub content: Content,
}

/// Message content, chosen at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    /// Plain text
    Text {
        /// The text string
        text: String,
    },
    /// Assistant turn requesting one or more tool invocations
    ToolCall {
        /// Text the model emitted alongside the calls
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Invocations in the order the provider returned them
        calls: Vec<ToolInvocation>,
    },
    /// Outcome of one invocation
    ToolResult(ToolResult),
}

impl Message {
    /// System instruction
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text { text: text.into() },
        }
    }

    /// User message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text { text: text.into() },
        }
    }

    /// Final assistant answer
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text { text: text.into() },
        }
    }

    /// Assistant turn that requested tools
    pub const fn tool_calls(text: Option<String>, calls: Vec<ToolInvocation>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::ToolCall { text, calls },
        }
    }

    /// Result of one tool invocation
    pub const fn tool_result(result: ToolResult) -> Self {
        Self {
            role: Role::Tool,
            content: Content::ToolResult(result),
        }
    }

    /// Text carried by this message, if any
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text { text } => Some(text),
            Content::ToolCall { text, .. } => text.as_deref(),
            Content::ToolResult(_) => None,
        }
    }

    /// Tool result carried by this message, if any
    pub const fn as_tool_result(&self) -> Option<&ToolResult> {
        match &self.content {
            Content::ToolResult(result) => Some(result),
            _ => None,
        }
    }
}

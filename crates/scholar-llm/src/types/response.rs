use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use super::tool::ToolInvocation;

/// Token usage, additive across turns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    pub input_tokens: u64,
    /// Tokens generated by the model
    pub output_tokens: u64,
}

impl Usage {
    /// Usage with the given counts
    pub const fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Input plus output tokens
    pub const fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

impl Add for Usage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            input_tokens: self.input_tokens.saturating_add(rhs.input_tokens),
            output_tokens: self.output_tokens.saturating_add(rhs.output_tokens),
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// One parsed provider turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeutralTurn {
    /// Text the model produced, `None` when it produced none
    pub text: Option<String>,
    /// Tool invocations in provider order
    pub tool_calls: Vec<ToolInvocation>,
    /// Usage reported for this turn, zero when the vendor omitted it
    pub usage: Usage,
}

impl NeutralTurn {
    /// Plain text turn
    pub fn text(text: impl Into<String>, usage: Usage) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
            usage,
        }
    }

    /// Turn that requests tools
    pub const fn tool_calls(tool_calls: Vec<ToolInvocation>, usage: Usage) -> Self {
        Self {
            text: None,
            tool_calls,
            usage,
        }
    }

    /// Neither text nor tool calls
    pub const fn is_empty(&self) -> bool {
        self.text.is_none() && self.tool_calls.is_empty()
    }
}

/// Collapse collected text fragments, treating blank output as no text
pub(crate) fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_owned()) }
}

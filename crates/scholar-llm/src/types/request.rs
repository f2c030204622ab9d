use serde::{Deserialize, Serialize};

use super::message::Message;
use super::tool::ToolSpec;

/// Parameters controlling text generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Maximum tokens to generate per turn
    pub max_tokens: u32,
    /// Nucleus sampling threshold
    pub top_p: f32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            top_p: 1.0,
            temperature: 0.0,
        }
    }
}

/// Everything an adapter needs to translate one turn
///
/// Borrowed from the driver; adapters never mutate the history.
#[derive(Debug, Clone, Copy)]
pub struct TurnRequest<'a> {
    /// Model id as the provider knows it
    pub model: &'a str,
    /// System prompt
    pub system_prompt: &'a str,
    /// Full history so far, not just the latest delta
    pub history: &'a [Message],
    /// Tools the model may call
    pub tools: &'a [ToolSpec],
    /// Generation options
    pub options: &'a GenerationOptions,
}

use serde::Deserialize;

/// Prompt given to the model unless the config overrides it
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a scientific research assistant. Quote sources with \\cite{document_id}.";

/// Chat defaults applied when a request leaves them unset
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// System prompt sent with every completion
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Model used when the caller names none
    #[serde(default)]
    pub default_model: Option<String>,
    /// Maximum tokens per model turn
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Nucleus sampling threshold
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            default_model: None,
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            temperature: default_temperature(),
        }
    }
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_owned()
}

const fn default_max_tokens() -> u32 {
    1024
}

#[allow(clippy::missing_const_for_fn)]
fn default_top_p() -> f32 {
    1.0
}

#[allow(clippy::missing_const_for_fn)]
fn default_temperature() -> f32 {
    0.0
}

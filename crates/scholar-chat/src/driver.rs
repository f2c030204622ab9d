//! Turn loop between a model provider and the tool registry
//!
//! One [`CompletionDriver::run_completion`] call owns its history, usage and
//! round counter. Each provider turn either ends the completion with text or
//! requests tools; every requested tool runs sequentially in provider order
//! and all results are appended before the next provider call.

use std::sync::Arc;

use scholar_core::CallerId;
use scholar_llm::{GenerationOptions, Message, Provider, ToolResult, TurnRequest, Usage};
use tokio_util::sync::CancellationToken;

use crate::attribution::{AttributedSource, SourceAttributor};
use crate::error::ChatError;
use crate::tools::{self, ToolRegistry};

/// Tool rounds allowed before the completion is abandoned
pub const MAX_TOOL_ROUNDS: u32 = 6;

/// Input of one completion, immutable once started
pub struct CompletionRequest {
    pub caller: CallerId,
    pub model: String,
    pub system_prompt: String,
    /// Prior thread messages followed by the new user message
    pub history: Vec<Message>,
    pub options: GenerationOptions,
    pub tools: ToolRegistry,
}

/// Outcome of a successful completion
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Final assistant text
    pub message: String,
    /// Request history plus every message generated, final answer included
    pub history: Vec<Message>,
    /// Sum of every turn's usage
    pub usage: Usage,
    /// Evidence retrieved during this completion
    pub sources: Vec<AttributedSource>,
    /// Tool rounds executed
    pub rounds: u32,
}

/// Runs completions against one provider
pub struct CompletionDriver {
    provider: Arc<dyn Provider>,
    attributor: SourceAttributor,
}

impl CompletionDriver {
    pub fn new(provider: Arc<dyn Provider>, attributor: SourceAttributor) -> Self {
        Self { provider, attributor }
    }

    /// Drive the conversation until the model answers with text
    ///
    /// Cancellation is checked around every provider call and tool
    /// execution; a cancelled completion returns `ChatError::Cancelled` and
    /// its partial history is dropped.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: provider failure, unknown tool, tool
    /// failure, round limit, empty turn, or cancellation.
    pub async fn run_completion(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse, ChatError> {
        let CompletionRequest {
            caller,
            model,
            system_prompt,
            mut history,
            options,
            tools,
        } = request;

        let specs = tools.specs();
        let generated_from = history.len();
        let mut usage = Usage::default();
        let mut rounds = 0;

        loop {
            let turn_request = TurnRequest {
                model: &model,
                system_prompt: &system_prompt,
                history: &history,
                tools: &specs,
                options: &options,
            };

            let turn = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ChatError::Cancelled),
                turn = self.provider.complete(&turn_request) => turn?,
            };

            usage += turn.usage;
            tracing::debug!(
                provider = %self.provider.name(),
                round = rounds,
                tool_calls = turn.tool_calls.len(),
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "model turn completed"
            );

            if turn.tool_calls.is_empty() {
                let Some(text) = turn.text else {
                    return Err(ChatError::EmptyModelResponse);
                };

                history.push(Message::assistant(text.clone()));
                let sources = self.attributor.attribute(&caller, &history[generated_from..]).await;

                return Ok(CompletionResponse {
                    message: text,
                    history,
                    usage,
                    sources,
                    rounds,
                });
            }

            if rounds == MAX_TOOL_ROUNDS {
                tracing::warn!(provider = %self.provider.name(), rounds, "model kept requesting tools");
                return Err(ChatError::ToolLoopExceeded { rounds });
            }

            // Resolve every name first so an unknown tool fails before any side effect
            let handlers = turn
                .tool_calls
                .iter()
                .map(|invocation| tools.handler(invocation))
                .collect::<Result<Vec<_>, _>>()?;

            let mut results = Vec::with_capacity(handlers.len());
            for (handler, invocation) in handlers.iter().zip(&turn.tool_calls) {
                let payload = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(ChatError::Cancelled),
                    payload = tools::run(handler.as_ref(), invocation) => payload?,
                };
                results.push(ToolResult::payload(&invocation.id, &invocation.name, payload));
            }

            history.push(Message::tool_calls(turn.text, turn.tool_calls));
            history.extend(results.into_iter().map(Message::tool_result));
            rounds += 1;
        }
    }
}

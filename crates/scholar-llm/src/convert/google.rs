//! Conversion between the neutral model and Google Generative Language format

use serde_json::{Value, json};

use crate::protocol::google::{
    GoogleContent, GoogleFunctionCall, GoogleFunctionDeclaration, GoogleFunctionResponse, GoogleGenerationConfig,
    GooglePart, GoogleRequest, GoogleResponse, GoogleTool,
};
use crate::types::response::non_blank;
use crate::types::{Content, NeutralTurn, Role, ToolInvocation, ToolOutcome, ToolResult, TurnRequest, Usage};

// -- Outbound: neutral turn request -> Google wire request --

impl From<&TurnRequest<'_>> for GoogleRequest {
    fn from(req: &TurnRequest<'_>) -> Self {
        let mut system_parts = Vec::new();
        if !req.system_prompt.is_empty() {
            system_parts.push(GooglePart::text(req.system_prompt));
        }

        let mut contents: Vec<GoogleContent> = Vec::new();
        for msg in req.history {
            let role = match (msg.role, &msg.content) {
                (Role::System, Content::Text { text }) => {
                    system_parts.push(GooglePart::text(text.clone()));
                    continue;
                }
                (Role::Assistant, _) => "model",
                _ => "user",
            };
            push_parts(&mut contents, role, content_parts(&msg.content));
        }

        let tools = (!req.tools.is_empty()).then(|| {
            vec![GoogleTool {
                function_declarations: req
                    .tools
                    .iter()
                    .map(|t| GoogleFunctionDeclaration {
                        name: t.name.clone(),
                        description: Some(t.description.clone()),
                        parameters: Some(t.parameters.clone()),
                    })
                    .collect(),
            }]
        });

        Self {
            contents,
            system_instruction: (!system_parts.is_empty()).then(|| GoogleContent {
                role: None,
                parts: system_parts,
            }),
            generation_config: Some(GoogleGenerationConfig {
                temperature: Some(req.options.temperature),
                top_p: Some(req.options.top_p),
                max_output_tokens: Some(req.options.max_tokens),
            }),
            tools,
        }
    }
}

fn content_parts(content: &Content) -> Vec<GooglePart> {
    match content {
        Content::Text { text } => {
            if text.is_empty() {
                Vec::new()
            } else {
                vec![GooglePart::text(text.clone())]
            }
        }
        Content::ToolCall { text, calls } => text
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| GooglePart::text(t.clone()))
            .chain(calls.iter().map(|call| {
                GooglePart::function_call(GoogleFunctionCall {
                    name: call.name.clone(),
                    args: call.arguments_value(),
                })
            }))
            .collect(),
        Content::ToolResult(result) => vec![GooglePart::function_response(GoogleFunctionResponse {
            name: result.tool_name.clone(),
            response: function_response(result),
        })],
    }
}

/// Google wants the function response as a JSON object
///
/// Payloads that parse as an object are passed through; anything else is
/// wrapped so it still reaches the model.
fn function_response(result: &ToolResult) -> Value {
    match &result.outcome {
        ToolOutcome::Payload(payload) => match serde_json::from_str::<Value>(payload) {
            Ok(object @ Value::Object(_)) => object,
            _ => json!({ "result": payload }),
        },
        ToolOutcome::Failure(message) => json!({ "error": message }),
    }
}

/// Append parts, merging into the previous content when the role repeats
fn push_parts(contents: &mut Vec<GoogleContent>, role: &str, parts: Vec<GooglePart>) {
    if parts.is_empty() {
        return;
    }

    match contents.last_mut() {
        Some(last) if last.role.as_deref() == Some(role) => last.parts.extend(parts),
        _ => contents.push(GoogleContent {
            role: Some(role.to_owned()),
            parts,
        }),
    }
}

// -- Inbound: Google wire response -> neutral turn --

impl From<GoogleResponse> for NeutralTurn {
    fn from(resp: GoogleResponse) -> Self {
        let usage = resp
            .usage_metadata
            .map(|u| Usage::new(u.prompt_token_count.into(), u.candidates_token_count.into()))
            .unwrap_or_default();

        let Some(candidate) = resp.candidates.into_iter().next() else {
            return Self {
                usage,
                ..Self::default()
            };
        };

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for part in candidate.content.parts {
            let thought = part.is_thought();

            if let Some(call) = part.function_call {
                // The vendor assigns no call ids
                let id = format!("call_{}_{}", tool_calls.len(), call.name);
                tool_calls.push(ToolInvocation::new(id, call.name, call.args));
            }

            // Reasoning is never part of the answer
            if let Some(fragment) = part.text.filter(|_| !thought) {
                text.push_str(&fragment);
            }
        }

        Self {
            text: non_blank(&text),
            tool_calls,
            usage,
        }
    }
}

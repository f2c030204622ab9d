//! Conversion between the neutral model and the Anthropic Messages format

use crate::protocol::anthropic::{
    AnthropicContentBlock, AnthropicMessage, AnthropicRequest, AnthropicResponse, AnthropicResponseBlock, AnthropicTool,
};
use crate::types::response::non_blank;
use crate::types::{Content, Message, NeutralTurn, Role, ToolInvocation, ToolSpec, TurnRequest, Usage};

// -- Outbound: neutral turn request -> Anthropic wire request --

impl From<&TurnRequest<'_>> for AnthropicRequest {
    fn from(req: &TurnRequest<'_>) -> Self {
        let mut system: Vec<&str> = Vec::new();
        if !req.system_prompt.is_empty() {
            system.push(req.system_prompt);
        }

        let mut messages: Vec<AnthropicMessage> = Vec::new();
        for msg in req.history {
            if let (Role::System, Content::Text { text }) = (msg.role, &msg.content) {
                system.push(text);
                continue;
            }
            push_blocks(&mut messages, wire_role(msg), content_blocks(&msg.content));
        }

        let tools = (!req.tools.is_empty()).then(|| req.tools.iter().map(AnthropicTool::from).collect());

        Self {
            model: req.model.to_owned(),
            max_tokens: req.options.max_tokens,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages,
            temperature: Some(req.options.temperature),
            top_p: Some(req.options.top_p),
            tools,
        }
    }
}

impl From<&ToolSpec> for AnthropicTool {
    fn from(spec: &ToolSpec) -> Self {
        Self {
            name: spec.name.clone(),
            description: Some(spec.description.clone()),
            input_schema: spec.parameters.clone(),
        }
    }
}

/// Anthropic only knows user and assistant; tool results travel as user content
const fn wire_role(msg: &Message) -> &'static str {
    match msg.role {
        Role::Assistant => "assistant",
        Role::User | Role::Tool | Role::System => "user",
    }
}

fn content_blocks(content: &Content) -> Vec<AnthropicContentBlock> {
    match content {
        Content::Text { text } => {
            if text.is_empty() {
                Vec::new()
            } else {
                vec![AnthropicContentBlock::Text { text: text.clone() }]
            }
        }
        Content::ToolCall { text, calls } => text
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| AnthropicContentBlock::Text { text: t.clone() })
            .chain(calls.iter().map(|call| AnthropicContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.arguments_value(),
            }))
            .collect(),
        Content::ToolResult(result) => vec![AnthropicContentBlock::ToolResult {
            tool_use_id: result.invocation_id.clone(),
            content: Some(result.content().to_owned()),
            is_error: result.is_failure().then_some(true),
        }],
    }
}

/// Append blocks, merging into the previous message when the role repeats
///
/// The API requires alternating roles, so all tool results of one turn end
/// up in a single user message.
fn push_blocks(messages: &mut Vec<AnthropicMessage>, role: &str, blocks: Vec<AnthropicContentBlock>) {
    if blocks.is_empty() {
        return;
    }

    match messages.last_mut() {
        Some(last) if last.role == role => last.content.extend(blocks),
        _ => messages.push(AnthropicMessage {
            role: role.to_owned(),
            content: blocks,
        }),
    }
}

// -- Inbound: Anthropic wire response -> neutral turn --

impl From<AnthropicResponse> for NeutralTurn {
    fn from(resp: AnthropicResponse) -> Self {
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in resp.content {
            match block {
                AnthropicResponseBlock::Text { text: fragment } => text.push_str(&fragment),
                AnthropicResponseBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolInvocation::new(id, name, input));
                }
                AnthropicResponseBlock::Other => {}
            }
        }

        let usage = resp
            .usage
            .map(|u| Usage::new(u.input_tokens.into(), u.output_tokens.into()))
            .unwrap_or_default();

        Self {
            text: non_blank(&text),
            tool_calls,
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{GenerationOptions, ToolResult};

    fn sources_tool() -> ToolSpec {
        ToolSpec {
            name: "get_sources".to_owned(),
            description: "Retrieves sources".to_owned(),
            parameters: json!({"type": "object", "properties": {"prompt": {"type": "string"}}}),
        }
    }

    #[test]
    fn tool_round_is_encoded_with_merged_results() {
        let history = vec![
            Message::user("What is CRISPR?"),
            Message::tool_calls(
                Some("Searching.".to_owned()),
                vec![
                    ToolInvocation::new("toolu_1", "get_sources", json!({"prompt": "CRISPR"})),
                    ToolInvocation::new("toolu_2", "get_sources", json!({"prompt": "Cas9"})),
                ],
            ),
            Message::tool_result(ToolResult::payload("toolu_1", "get_sources", r#"{"sources":[]}"#)),
            Message::tool_result(ToolResult::failure("toolu_2", "get_sources", "search failed")),
        ];
        let tools = [sources_tool()];
        let options = GenerationOptions::default();
        let request = TurnRequest {
            model: "claude-3-haiku",
            system_prompt: "Be precise.",
            history: &history,
            tools: &tools,
            options: &options,
        };

        let wire = AnthropicRequest::from(&request);

        assert_eq!(wire.system.as_deref(), Some("Be precise."));
        assert_eq!(wire.max_tokens, 1024);
        assert_eq!(wire.messages.len(), 3);
        assert_eq!(wire.messages[1].role, "assistant");
        assert_eq!(wire.messages[1].content.len(), 3);
        assert_eq!(wire.messages[2].role, "user");
        assert_eq!(
            wire.messages[2].content,
            vec![
                AnthropicContentBlock::ToolResult {
                    tool_use_id: "toolu_1".to_owned(),
                    content: Some(r#"{"sources":[]}"#.to_owned()),
                    is_error: None,
                },
                AnthropicContentBlock::ToolResult {
                    tool_use_id: "toolu_2".to_owned(),
                    content: Some("search failed".to_owned()),
                    is_error: Some(true),
                },
            ]
        );
        assert_eq!(wire.tools.unwrap()[0].name, "get_sources");
    }

    #[test]
    fn system_messages_in_history_join_the_system_prompt() {
        let history = vec![Message::system("Answer in German."), Message::user("Hi")];
        let options = GenerationOptions::default();
        let request = TurnRequest {
            model: "m",
            system_prompt: "Base prompt.",
            history: &history,
            tools: &[],
            options: &options,
        };

        let wire = AnthropicRequest::from(&request);

        assert_eq!(wire.system.as_deref(), Some("Base prompt.\n\nAnswer in German."));
        assert_eq!(wire.messages.len(), 1);
        assert!(wire.tools.is_none());
    }

    #[test]
    fn response_with_tool_use_parses() {
        let resp: AnthropicResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Let me search."},
                {"type": "tool_use", "id": "toolu_1", "name": "get_sources", "input": {"prompt": "CRISPR"}}
            ],
            "model": "claude-3-haiku",
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 7}
        }))
        .unwrap();

        let turn = NeutralTurn::from(resp);

        assert_eq!(turn.text.as_deref(), Some("Let me search."));
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].arguments["prompt"], "CRISPR");
        assert_eq!(turn.usage, Usage::new(12, 7));
    }

    #[test]
    fn response_without_content_or_usage_is_an_empty_turn() {
        let resp: AnthropicResponse =
            serde_json::from_value(json!({"id": "msg_1", "content": [{"type": "thinking", "thinking": "..."}]})).unwrap();

        let turn = NeutralTurn::from(resp);

        assert!(turn.is_empty());
        assert_eq!(turn.usage, Usage::default());
    }

    #[test]
    fn final_text_is_trimmed() {
        let resp: AnthropicResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "content": [{"type": "text", "text": "\n Answer \\cite{doc-1}. \n"}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }))
        .unwrap();

        assert_eq!(NeutralTurn::from(resp).text.as_deref(), Some("Answer \\cite{doc-1}."));
    }
}

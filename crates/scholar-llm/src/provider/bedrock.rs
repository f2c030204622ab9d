//! AWS Bedrock provider implementation using the Converse API

use async_trait::async_trait;
use aws_sdk_bedrockruntime::Client as BedrockClient;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, ConverseOutput, InferenceConfiguration, Message as BedrockMessage,
    SystemContentBlock, TokenUsage, Tool, ToolConfiguration, ToolInputSchema, ToolResultBlock, ToolResultContentBlock,
    ToolResultStatus, ToolSpecification, ToolUseBlock,
};
use scholar_config::{BedrockConfig, LlmProviderConfig, LlmProviderType};
use secrecy::ExposeSecret;

use super::ProviderAdapter;
use crate::error::LlmError;
use crate::types::response::non_blank;
use crate::types::{
    Content, GenerationOptions, NeutralTurn, Role, ToolInvocation, ToolResult, ToolSpec, TurnRequest, Usage,
};

/// Everything one `Converse` call needs
pub struct ConverseInput {
    model: String,
    system: Vec<SystemContentBlock>,
    messages: Vec<BedrockMessage>,
    inference: InferenceConfiguration,
    tool_config: Option<ToolConfiguration>,
}

/// AWS Bedrock provider using the Converse API
pub struct BedrockProvider {
    name: String,
    client: BedrockClient,
}

impl BedrockProvider {
    /// Create from provider configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if the provider type is not Bedrock.
    pub async fn new(name: String, config: &LlmProviderConfig) -> Result<Self, LlmError> {
        let LlmProviderType::Bedrock(bedrock_config) = &config.provider_type else {
            return Err(LlmError::Internal(anyhow::anyhow!("expected bedrock provider type")));
        };

        let client = build_bedrock_client(bedrock_config).await;

        Ok(Self { name, client })
    }
}

/// Build a Bedrock runtime client from configuration
async fn build_bedrock_client(config: &BedrockConfig) -> BedrockClient {
    let mut aws_config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));

    // Explicit keys take precedence over the default credential chain
    if let (Some(access_key), Some(secret_key)) = (&config.access_key_id, &config.secret_access_key) {
        let credentials = aws_credential_types::Credentials::new(
            access_key.expose_secret(),
            secret_key.expose_secret(),
            None,
            None,
            "scholar-config",
        );
        aws_config_builder = aws_config_builder.credentials_provider(credentials);
    }

    let aws_config = aws_config_builder.load().await;
    BedrockClient::new(&aws_config)
}

#[async_trait]
impl ProviderAdapter for BedrockProvider {
    type WireRequest = ConverseInput;

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn translate_request(&self, request: &TurnRequest<'_>) -> Result<ConverseInput, LlmError> {
        build_converse_input(request)
    }

    async fn send_and_parse(&self, wire: ConverseInput) -> Result<NeutralTurn, LlmError> {
        let output = self
            .client
            .converse()
            .model_id(wire.model)
            .set_system(Some(wire.system))
            .set_messages(Some(wire.messages))
            .inference_config(wire.inference)
            .set_tool_config(wire.tool_config)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(provider = %self.name, error = %e, "bedrock converse failed");
                LlmError::Upstream(e.to_string())
            })?;

        tracing::debug!(provider = %self.name, stop_reason = output.stop_reason().as_str(), "bedrock turn received");

        Ok(turn_from_output(output.output(), output.usage()))
    }
}

/// Build the Converse input from a neutral turn request
fn build_converse_input(request: &TurnRequest<'_>) -> Result<ConverseInput, LlmError> {
    let mut system = Vec::new();
    if !request.system_prompt.is_empty() {
        system.push(SystemContentBlock::Text(request.system_prompt.to_owned()));
    }

    let mut turns: Vec<(ConversationRole, Vec<ContentBlock>)> = Vec::new();
    for msg in request.history {
        if let (Role::System, Content::Text { text }) = (msg.role, &msg.content) {
            system.push(SystemContentBlock::Text(text.clone()));
            continue;
        }

        let role = match msg.role {
            Role::Assistant => ConversationRole::Assistant,
            Role::User | Role::Tool | Role::System => ConversationRole::User,
        };
        let blocks = content_blocks(&msg.content)?;
        if blocks.is_empty() {
            continue;
        }

        // Converse requires alternating roles
        match turns.last_mut() {
            Some((last_role, last_blocks)) if *last_role == role => last_blocks.extend(blocks),
            _ => turns.push((role, blocks)),
        }
    }

    let messages = turns
        .into_iter()
        .map(|(role, blocks)| {
            BedrockMessage::builder()
                .role(role)
                .set_content(Some(blocks))
                .build()
                .map_err(|e| LlmError::InvalidRequest(format!("invalid bedrock message: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ConverseInput {
        model: request.model.to_owned(),
        system,
        messages,
        inference: build_inference_config(request.options),
        tool_config: build_tool_config(request.tools)?,
    })
}

fn content_blocks(content: &Content) -> Result<Vec<ContentBlock>, LlmError> {
    let blocks = match content {
        Content::Text { text } => {
            if text.is_empty() {
                Vec::new()
            } else {
                vec![ContentBlock::Text(text.clone())]
            }
        }
        Content::ToolCall { text, calls } => {
            let mut blocks: Vec<ContentBlock> = text
                .iter()
                .filter(|t| !t.is_empty())
                .map(|t| ContentBlock::Text(t.clone()))
                .collect();
            for call in calls {
                blocks.push(tool_use_block(call)?);
            }
            blocks
        }
        Content::ToolResult(result) => vec![tool_result_block(result)?],
    };

    Ok(blocks)
}

fn tool_use_block(call: &ToolInvocation) -> Result<ContentBlock, LlmError> {
    let block = ToolUseBlock::builder()
        .tool_use_id(&call.id)
        .name(&call.name)
        .input(value_to_document(&call.arguments_value()))
        .build()
        .map_err(|e| LlmError::InvalidRequest(format!("invalid tool use: {e}")))?;

    Ok(ContentBlock::ToolUse(block))
}

fn tool_result_block(result: &ToolResult) -> Result<ContentBlock, LlmError> {
    let mut builder = ToolResultBlock::builder()
        .tool_use_id(&result.invocation_id)
        .content(ToolResultContentBlock::Text(result.content().to_owned()));

    if result.is_failure() {
        builder = builder.status(ToolResultStatus::Error);
    }

    let block = builder
        .build()
        .map_err(|e| LlmError::InvalidRequest(format!("invalid tool result: {e}")))?;

    Ok(ContentBlock::ToolResult(block))
}

/// Build inference configuration from the generation options
fn build_inference_config(options: &GenerationOptions) -> InferenceConfiguration {
    InferenceConfiguration::builder()
        .max_tokens(i32::try_from(options.max_tokens).unwrap_or(i32::MAX))
        .temperature(options.temperature)
        .top_p(options.top_p)
        .build()
}

/// Build tool configuration from the advertised tools
fn build_tool_config(tools: &[ToolSpec]) -> Result<Option<ToolConfiguration>, LlmError> {
    if tools.is_empty() {
        return Ok(None);
    }

    let mut tool_config = ToolConfiguration::builder();
    for tool in tools {
        let spec = ToolSpecification::builder()
            .name(&tool.name)
            .description(&tool.description)
            .input_schema(ToolInputSchema::Json(value_to_document(&tool.parameters)))
            .build()
            .map_err(|e| LlmError::InvalidRequest(format!("invalid tool spec: {e}")))?;
        tool_config = tool_config.tools(Tool::ToolSpec(spec));
    }

    tool_config
        .build()
        .map(Some)
        .map_err(|e| LlmError::InvalidRequest(format!("invalid tool config: {e}")))
}

/// Parse Converse output into a neutral turn
fn turn_from_output(output: Option<&ConverseOutput>, usage: Option<&TokenUsage>) -> NeutralTurn {
    let usage = usage
        .map(|u| {
            Usage::new(
                u64::try_from(u.input_tokens()).unwrap_or_default(),
                u64::try_from(u.output_tokens()).unwrap_or_default(),
            )
        })
        .unwrap_or_default();

    let Some(ConverseOutput::Message(msg)) = output else {
        return NeutralTurn {
            usage,
            ..NeutralTurn::default()
        };
    };

    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in msg.content() {
        match block {
            ContentBlock::Text(t) => text.push_str(t),
            ContentBlock::ToolUse(tu) => {
                tool_calls.push(ToolInvocation::new(
                    tu.tool_use_id(),
                    tu.name(),
                    document_to_value(tu.input()),
                ));
            }
            _ => {}
        }
    }

    NeutralTurn {
        text: non_blank(&text),
        tool_calls,
        usage,
    }
}

/// Convert a `serde_json::Value` to an AWS `Document`
fn value_to_document(value: &serde_json::Value) -> aws_smithy_types::Document {
    match value {
        serde_json::Value::Null => aws_smithy_types::Document::Null,
        serde_json::Value::Bool(b) => aws_smithy_types::Document::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                aws_smithy_types::Document::Number(aws_smithy_types::Number::PosInt(u))
            } else if let Some(i) = n.as_i64() {
                aws_smithy_types::Document::Number(aws_smithy_types::Number::NegInt(i))
            } else {
                n.as_f64().map_or(aws_smithy_types::Document::Null, |f| {
                    aws_smithy_types::Document::Number(aws_smithy_types::Number::Float(f))
                })
            }
        }
        serde_json::Value::String(s) => aws_smithy_types::Document::String(s.clone()),
        serde_json::Value::Array(arr) => aws_smithy_types::Document::Array(arr.iter().map(value_to_document).collect()),
        serde_json::Value::Object(map) => {
            let obj: std::collections::HashMap<String, aws_smithy_types::Document> =
                map.iter().map(|(k, v)| (k.clone(), value_to_document(v))).collect();
            aws_smithy_types::Document::Object(obj)
        }
    }
}

/// Convert an AWS `Document` to a `serde_json::Value`
fn document_to_value(doc: &aws_smithy_types::Document) -> serde_json::Value {
    match doc {
        aws_smithy_types::Document::Object(map) => {
            let obj: serde_json::Map<String, serde_json::Value> =
                map.iter().map(|(k, v)| (k.clone(), document_to_value(v))).collect();
            serde_json::Value::Object(obj)
        }
        aws_smithy_types::Document::Array(arr) => serde_json::Value::Array(arr.iter().map(document_to_value).collect()),
        aws_smithy_types::Document::Number(n) => match *n {
            aws_smithy_types::Number::PosInt(u) => serde_json::Value::from(u),
            aws_smithy_types::Number::NegInt(i) => serde_json::Value::from(i),
            aws_smithy_types::Number::Float(f) => {
                serde_json::Number::from_f64(f).map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
        },
        aws_smithy_types::Document::String(s) => serde_json::Value::String(s.clone()),
        aws_smithy_types::Document::Bool(b) => serde_json::Value::Bool(*b),
        aws_smithy_types::Document::Null => serde_json::Value::Null,
    }
}

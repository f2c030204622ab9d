//! Post a message to a thread and answer it from the collection, and manage
//! the caller's threads

use std::sync::Arc;

use scholar_config::ChatConfig;
use scholar_core::RequestContext;
use scholar_llm::{GenerationOptions, Message, Provider, Providers, Role, Usage};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::attribution::{AttributedSource, SourceAttributor};
use crate::driver::{CompletionDriver, CompletionRequest};
use crate::error::ChatError;
use crate::retrieval::Retrieval;
use crate::sources::GetSources;
use crate::store::{Datastore, ModelUsage, Thread};
use crate::tools::ToolRegistry;

/// Model selection and sampling for one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    pub model: String,
    pub max_tokens: u32,
    pub top_p: f32,
    pub temperature: f32,
}

/// How much evidence `get_sources` may return
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOptions {
    pub documents: u32,
    pub threshold: f32,
}

/// A new user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMessage {
    /// Existing thread to continue; a new thread is started when absent
    #[serde(default)]
    pub thread_id: Option<String>,
    pub collection_id: String,
    pub prompt: String,
    #[serde(default)]
    pub model_options: Option<ModelOptions>,
    #[serde(default)]
    pub retrieval_options: Option<RetrievalOptions>,
}

/// Answer to a posted message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMessageReply {
    pub thread_id: Uuid,
    pub prompt: String,
    pub completion: String,
    pub sources: Vec<AttributedSource>,
    pub usage: Usage,
}

/// A one-off prompt answered without tools or a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectCompletion {
    pub prompt: String,
    #[serde(default)]
    pub model_options: Option<ModelOptions>,
}

/// Answer to a [`DirectCompletion`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectCompletionReply {
    pub completion: String,
    pub usage: Usage,
}

/// Validated form of [`PostMessage`]
struct Validated {
    thread_id: Option<Uuid>,
    collection_id: Uuid,
    prompt: String,
    model: ModelOptions,
    retrieval: RetrievalOptions,
}

/// Request handling around the completion driver
pub struct ChatService {
    providers: Arc<Providers>,
    retrieval: Arc<dyn Retrieval>,
    datastore: Arc<dyn Datastore>,
    system_prompt: String,
}

impl ChatService {
    pub fn new(
        providers: Arc<Providers>,
        retrieval: Arc<dyn Retrieval>,
        datastore: Arc<dyn Datastore>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            providers,
            retrieval,
            datastore,
            system_prompt: config.system_prompt.clone(),
        }
    }

    /// Answer `message`, persisting the thread only if the completion succeeds
    ///
    /// # Errors
    ///
    /// Returns `ChatError::InvalidRequest` for malformed input or an unknown
    /// model, `ChatError::Storage` if the thread cannot be loaded or stored,
    /// and any error of the completion itself.
    pub async fn post_message(
        &self,
        ctx: &RequestContext,
        message: PostMessage,
        cancel: &CancellationToken,
    ) -> Result<PostMessageReply, ChatError> {
        let request = validate(message)?;
        let caller = &ctx.caller;

        let (provider, model_id) = self.resolve(&request.model)?;

        let mut thread = match request.thread_id {
            Some(thread_id) => self.datastore.load_thread(caller, thread_id).await?,
            None => Thread::new(caller.clone(), request.collection_id),
        };

        tracing::info!(
            request_id = %ctx.request_id,
            caller = %caller,
            thread = %thread.id,
            provider = %provider.name(),
            model = %model_id,
            "posting message"
        );

        let mut history = thread.messages.clone();
        history.push(Message::user(request.prompt.clone()));

        let mut tools = ToolRegistry::default();
        tools.register(Arc::new(GetSources::new(
            Arc::clone(&self.retrieval),
            Arc::clone(&self.datastore),
            caller.clone(),
            request.collection_id,
            request.retrieval.documents,
            request.retrieval.threshold,
        )))?;

        let completion = CompletionRequest {
            caller: caller.clone(),
            model: model_id,
            system_prompt: self.system_prompt.clone(),
            history,
            options: GenerationOptions {
                max_tokens: request.model.max_tokens,
                top_p: request.model.top_p,
                temperature: request.model.temperature,
            },
            tools,
        };

        let driver = CompletionDriver::new(provider, SourceAttributor::new(Arc::clone(&self.datastore)));
        let response = driver.run_completion(completion, cancel).await.inspect_err(|e| {
            tracing::warn!(request_id = %ctx.request_id, thread = %thread.id, error = %e, "completion failed");
        })?;

        // Cancellation during attribution still discards the answer
        if cancel.is_cancelled() {
            return Err(ChatError::Cancelled);
        }

        thread.messages = response.history;
        self.datastore.store_thread(&thread).await?;

        self.record_usage(ctx, &request.model.model, response.usage).await;

        tracing::info!(
            request_id = %ctx.request_id,
            thread = %thread.id,
            rounds = response.rounds,
            sources = response.sources.len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            total_tokens = response.usage.total(),
            "message answered"
        );

        Ok(PostMessageReply {
            thread_id: thread.id,
            prompt: request.prompt,
            completion: response.message,
            sources: response.sources,
            usage: response.usage,
        })
    }

    /// Answer a single prompt with no tools, no thread and no sources
    ///
    /// # Errors
    ///
    /// Returns `ChatError::InvalidRequest` for a blank prompt, bad model
    /// options or an unknown model, and any error of the completion itself.
    pub async fn complete(
        &self,
        ctx: &RequestContext,
        request: DirectCompletion,
        cancel: &CancellationToken,
    ) -> Result<DirectCompletionReply, ChatError> {
        if request.prompt.trim().is_empty() {
            return Err(ChatError::InvalidRequest("prompt is empty".to_owned()));
        }
        let model = request
            .model_options
            .ok_or_else(|| ChatError::InvalidRequest("model options missing".to_owned()))?;
        validate_model(&model)?;

        let (provider, model_id) = self.resolve(&model)?;
        tracing::info!(
            request_id = %ctx.request_id,
            caller = %ctx.caller,
            provider = %provider.name(),
            model = %model_id,
            "direct completion"
        );

        let completion = CompletionRequest {
            caller: ctx.caller.clone(),
            model: model_id,
            system_prompt: String::new(),
            history: vec![Message::user(request.prompt)],
            options: GenerationOptions {
                max_tokens: model.max_tokens,
                top_p: model.top_p,
                temperature: model.temperature,
            },
            tools: ToolRegistry::default(),
        };

        let driver = CompletionDriver::new(provider, SourceAttributor::new(Arc::clone(&self.datastore)));
        let response = driver.run_completion(completion, cancel).await?;

        self.record_usage(ctx, &model.model, response.usage).await;

        Ok(DirectCompletionReply {
            completion: response.message,
            usage: response.usage,
        })
    }

    /// Load one of the caller's threads
    ///
    /// # Errors
    ///
    /// Returns `ChatError::InvalidRequest` for a malformed id and
    /// `ChatError::Storage` if the thread does not exist for this caller.
    pub async fn get_thread(&self, ctx: &RequestContext, thread_id: &str) -> Result<Thread, ChatError> {
        let thread_id = parse_id("thread", thread_id)?;
        Ok(self.datastore.load_thread(&ctx.caller, thread_id).await?)
    }

    /// Ids of the caller's threads over a collection, most recent first
    ///
    /// # Errors
    ///
    /// Returns `ChatError::InvalidRequest` for a malformed collection id and
    /// `ChatError::Storage` if the listing fails.
    pub async fn list_thread_ids(&self, ctx: &RequestContext, collection_id: &str) -> Result<Vec<Uuid>, ChatError> {
        let collection_id = parse_id("collection", collection_id)?;
        Ok(self.datastore.list_thread_ids(&ctx.caller, collection_id).await?)
    }

    /// Delete one of the caller's threads
    ///
    /// # Errors
    ///
    /// Returns `ChatError::InvalidRequest` for a malformed id and
    /// `ChatError::Storage` if the thread does not exist for this caller.
    pub async fn delete_thread(&self, ctx: &RequestContext, thread_id: &str) -> Result<(), ChatError> {
        let thread_id = parse_id("thread", thread_id)?;
        self.datastore.delete_thread(&ctx.caller, thread_id).await?;
        tracing::info!(request_id = %ctx.request_id, thread = %thread_id, "thread deleted");
        Ok(())
    }

    /// Remove the `exchange`-th prompt of a thread together with the tool
    /// rounds and answer that followed it
    ///
    /// Exchanges are counted from zero in thread order. The updated thread is
    /// stored and returned.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::InvalidRequest` for a malformed id or an exchange
    /// past the end of the thread, and `ChatError::Storage` if the thread
    /// cannot be loaded or stored.
    pub async fn delete_message(
        &self,
        ctx: &RequestContext,
        thread_id: &str,
        exchange: usize,
    ) -> Result<Thread, ChatError> {
        let thread_id = parse_id("thread", thread_id)?;
        let mut thread = self.datastore.load_thread(&ctx.caller, thread_id).await?;

        let starts: Vec<usize> = thread
            .messages
            .iter()
            .enumerate()
            .filter(|(_, message)| message.role == Role::User)
            .map(|(index, _)| index)
            .collect();
        let start = *starts.get(exchange).ok_or_else(|| {
            ChatError::InvalidRequest(format!("thread has {} messages, no message {exchange}", starts.len()))
        })?;
        let end = starts.get(exchange + 1).copied().unwrap_or(thread.messages.len());

        let kept = thread.messages.split_off(end);
        thread.messages.truncate(start);
        thread.messages.extend(kept);
        self.datastore.store_thread(&thread).await?;

        tracing::info!(
            request_id = %ctx.request_id,
            thread = %thread.id,
            exchange,
            removed = end - start,
            "message deleted"
        );
        Ok(thread)
    }

    fn resolve(&self, model: &ModelOptions) -> Result<(Arc<dyn Provider>, String), ChatError> {
        self.providers
            .resolve(&model.model)
            .map_err(|e| ChatError::InvalidRequest(e.to_string()))
    }

    /// Usage bookkeeping never fails a request
    async fn record_usage(&self, ctx: &RequestContext, model_id: &str, usage: Usage) {
        let record = ModelUsage::new(ctx.caller.clone(), model_id, usage);
        if let Err(e) = self.datastore.insert_model_usage(record).await {
            tracing::warn!(request_id = %ctx.request_id, error = %e, "failed to record model usage");
        }
    }
}

fn parse_id(kind: &str, id: &str) -> Result<Uuid, ChatError> {
    Uuid::parse_str(id).map_err(|_| ChatError::InvalidRequest(format!("invalid {kind} id")))
}

fn validate_model(model: &ModelOptions) -> Result<(), ChatError> {
    if model.max_tokens == 0 {
        return Err(ChatError::InvalidRequest("max_tokens must be positive".to_owned()));
    }
    if !(0.0..=1.0).contains(&model.top_p) {
        return Err(ChatError::InvalidRequest(format!(
            "top_p must be within 0.0..=1.0, got {}",
            model.top_p
        )));
    }
    if !(0.0..=2.0).contains(&model.temperature) {
        return Err(ChatError::InvalidRequest(format!(
            "temperature must be within 0.0..=2.0, got {}",
            model.temperature
        )));
    }
    Ok(())
}

fn validate(message: PostMessage) -> Result<Validated, ChatError> {
    let collection_id = parse_id("collection", &message.collection_id)?;

    let thread_id = message
        .thread_id
        .filter(|id| !id.is_empty())
        .map(|id| parse_id("thread", &id))
        .transpose()?;

    let model = message
        .model_options
        .ok_or_else(|| ChatError::InvalidRequest("model options missing".to_owned()))?;
    let retrieval = message
        .retrieval_options
        .ok_or_else(|| ChatError::InvalidRequest("retrieval options missing".to_owned()))?;

    if message.prompt.trim().is_empty() {
        return Err(ChatError::InvalidRequest("prompt is empty".to_owned()));
    }
    validate_model(&model)?;

    Ok(Validated {
        thread_id,
        collection_id,
        prompt: message.prompt,
        model,
        retrieval,
    })
}

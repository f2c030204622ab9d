//! Chat service wired to real adapters and an in-memory datastore

use std::sync::Arc;

use anyhow::Context;
use scholar_chat::{
    ChatError, ChatService, HttpRetrieval, MemoryDatastore, ModelOptions, PostMessage, PostMessageReply,
    RetrievalOptions,
};
use scholar_config::Config;
use scholar_core::RequestContext;
use scholar_llm::Providers;
use tokio_util::sync::CancellationToken;

/// Collection every test message targets
pub const COLLECTION_ID: &str = "0b6f3c1e-5a2d-4c8e-9f10-2d7b4a6e8c31";

/// A chat service plus the store behind it
pub struct TestChat {
    pub service: ChatService,
    pub store: Arc<MemoryDatastore>,
    pub ctx: RequestContext,
}

impl TestChat {
    /// Build the service the same way the binary does
    pub async fn start(config: &Config) -> anyhow::Result<Self> {
        let providers = Providers::from_config(&config.llm).await?;
        let retrieval_config = config.retrieval.as_ref().context("retrieval not configured")?;
        let store = Arc::new(MemoryDatastore::new());

        let service = ChatService::new(
            Arc::new(providers),
            Arc::new(HttpRetrieval::new(retrieval_config)?),
            store.clone(),
            &config.chat,
        );

        Ok(Self {
            service,
            store,
            ctx: RequestContext::new("alice"),
        })
    }

    /// Post `prompt` to `thread_id` (or a new thread)
    pub async fn post(&self, model: &str, prompt: &str, thread_id: Option<String>) -> Result<PostMessageReply, ChatError> {
        self.service
            .post_message(&self.ctx, message(model, prompt, thread_id), &CancellationToken::new())
            .await
    }
}

/// A well-formed message for `model`
pub fn message(model: &str, prompt: &str, thread_id: Option<String>) -> PostMessage {
    PostMessage {
        thread_id,
        collection_id: COLLECTION_ID.to_owned(),
        prompt: prompt.to_owned(),
        model_options: Some(ModelOptions {
            model: model.to_owned(),
            max_tokens: 256,
            top_p: 0.9,
            temperature: 0.1,
        }),
        retrieval_options: Some(RetrievalOptions {
            documents: 3,
            threshold: 0.4,
        }),
    }
}

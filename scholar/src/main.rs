#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::sync::Arc;

use anyhow::Context;
use args::Args;
use clap::Parser;
use scholar_chat::{
    ChatError, ChatService, HttpRetrieval, MemoryDatastore, ModelOptions, PostMessage, PostMessageReply,
    RetrievalOptions,
};
use scholar_config::Config;
use scholar_core::RequestContext;
use scholar_llm::Providers;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    // Initialize telemetry
    let _telemetry_guard = scholar_telemetry::init(config.telemetry.as_ref(), &args.log)?;

    let retrieval_config = config
        .retrieval
        .as_ref()
        .context("configuration has no [retrieval] section")?;
    let model = args
        .model
        .clone()
        .or_else(|| config.chat.default_model.clone())
        .context("no --model given and chat.default_model is unset")?;

    let providers = Providers::from_config(&config.llm).await?;
    tracing::info!(
        config_path = %args.config.display(),
        providers = providers.len(),
        model = %model,
        "starting scholar"
    );

    let service = ChatService::new(
        Arc::new(providers),
        Arc::new(HttpRetrieval::new(retrieval_config)?),
        Arc::new(MemoryDatastore::new()),
        &config.chat,
    );

    let template = PostMessage {
        thread_id: None,
        collection_id: args.collection.clone(),
        prompt: String::new(),
        model_options: Some(ModelOptions {
            model,
            max_tokens: config.chat.max_tokens,
            top_p: config.chat.top_p,
            temperature: config.chat.temperature,
        }),
        retrieval_options: Some(RetrievalOptions {
            documents: retrieval_config.documents,
            threshold: retrieval_config.threshold,
        }),
    };

    // Ctrl-C aborts the running completion without saving it
    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_clone.cancel();
    });

    if let Some(prompt) = args.prompt {
        let ctx = RequestContext::new(args.caller.as_str());
        let reply = service
            .post_message(&ctx, PostMessage { prompt, ..template }, &shutdown)
            .await?;
        print_reply(&reply);
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut thread_id = None;

    loop {
        let line = tokio::select! {
            () = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(prompt) = line else {
            break;
        };
        if prompt.trim().is_empty() {
            continue;
        }

        let ctx = RequestContext::new(args.caller.as_str());
        let message = PostMessage {
            thread_id: thread_id.clone(),
            prompt,
            ..template.clone()
        };

        match service.post_message(&ctx, message, &shutdown).await {
            Ok(reply) => {
                thread_id = Some(reply.thread_id.to_string());
                print_reply(&reply);
            }
            Err(ChatError::Cancelled) => break,
            Err(e) => eprintln!("error: {e}"),
        }
    }

    tracing::info!("scholar stopped");
    Ok(())
}

fn print_reply(reply: &PostMessageReply) {
    println!("{}", reply.completion);

    if !reply.sources.is_empty() {
        println!();
        for (idx, source) in reply.sources.iter().enumerate() {
            let name = if source.name.is_empty() {
                source.document_id.as_str()
            } else {
                source.name.as_str()
            };
            println!("[{}] {name} ({}, position {})", idx + 1, source.document_id, source.position);
        }
    }

    tracing::debug!(
        thread = %reply.thread_id,
        input_tokens = reply.usage.input_tokens,
        output_tokens = reply.usage.output_tokens,
        "reply printed"
    );
}

/// Wait for a shutdown signal (`SIGINT` or `SIGTERM`)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}

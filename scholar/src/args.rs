use std::path::PathBuf;

use clap::Parser;

/// Scholar research assistant
#[derive(Debug, Parser)]
#[command(name = "scholar", about = "Answer questions from a document collection with cited sources")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "scholar.toml", env = "SCHOLAR_CONFIG")]
    pub config: PathBuf,

    /// Collection to search for evidence
    #[arg(long, env = "SCHOLAR_COLLECTION")]
    pub collection: String,

    /// Model id, optionally prefixed with a provider name (`claude/claude-3-haiku`)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Caller the conversation is recorded for
    #[arg(long, default_value = "local", env = "SCHOLAR_CALLER")]
    pub caller: String,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, default_value = "warn")]
    pub log: String,

    /// Question to ask; reads questions from stdin, one per line, when omitted
    pub prompt: Option<String>,
}

//! CLI module - command definitions and handlers

mod ask;
mod config_cmd;
mod ingest;
mod search;
mod serve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use crate::embedding;
use crate::index::IndexStore;
use crate::llm::LlmProvider;
use crate::pipeline::Pipeline;
use crate::retriever::Retriever;

pub use ask::AskArgs;
pub use config_cmd::ConfigArgs;
pub use ingest::IngestArgs;
pub use search::SearchArgs;
pub use serve::ServeArgs;

/// grounded - answer questions from a fixed document, or say so
#[derive(Parser)]
#[command(name = "grounded")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: <config dir>/grounded/config.toml)
    #[arg(long, global = true, env = "GROUNDED_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Embed a newline-delimited corpus and (re)build the index
    Ingest(IngestArgs),

    /// Retrieve passages for a query without generating an answer
    Search(SearchArgs),

    /// Answer questions from the indexed corpus
    Ask(AskArgs),

    /// Start HTTP API server
    Serve(ServeArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Index location override shared by every command that touches an index
#[derive(Args, Debug, Clone, Default)]
pub struct IndexArgs {
    /// Index directory (overrides [index].dir)
    #[arg(long, env = "GROUNDED_INDEX_DIR")]
    pub index_dir: Option<PathBuf>,
}

/// Retrieval overrides shared by search, ask and serve
#[derive(Args, Debug, Clone, Default)]
pub struct RetrievalArgs {
    /// Number of passages to retrieve (overrides [retrieval].top_k)
    #[arg(long)]
    pub top_k: Option<usize>,

    /// OOD similarity threshold (overrides [retrieval].threshold)
    #[arg(long, allow_hyphen_values = true)]
    pub threshold: Option<f32>,
}

impl IndexArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.index_dir {
            config.index.dir = dir.clone();
        }
    }
}

impl RetrievalArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }
        if let Some(threshold) = self.threshold {
            config.retrieval.threshold = threshold;
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let explicit = self.config.as_deref();
        match self.command {
            Commands::Config(args) => config_cmd::run(args, explicit).await,
            Commands::Ingest(args) => ingest::run(args, load_config(explicit)?, self.quiet).await,
            Commands::Search(args) => search::run(args, load_config(explicit)?).await,
            Commands::Ask(args) => ask::run(args, load_config(explicit)?).await,
            Commands::Serve(args) => serve::run(args, load_config(explicit)?).await,
        }
    }
}

/// An explicit `--config` must load; the default location falls back to defaults
fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    match explicit {
        Some(path) => Config::load_from(path),
        None => Ok(Config::load()),
    }
}

/// Load the index and shared embedder named by `config`
pub(crate) async fn open_retriever(config: &Config) -> anyhow::Result<Retriever> {
    config.validate()?;

    let store = IndexStore::new(&config.index.dir, config.index.backend.parse()?);
    let index = store
        .load()
        .with_context(|| format!("Failed to load index at {}", config.index.dir.display()))?;
    info!("Loaded {} passages from {}", index.len(), config.index.dir.display());

    let embedder = embedding::shared(&config.embedding)
        .get()
        .await
        .context("Failed to initialize the embedding model")?;

    if index.meta().embedding_model != embedder.model_name() {
        tracing::warn!(
            "Index was built with '{}' but queries are embedded with '{}'",
            index.meta().embedding_model,
            embedder.model_name()
        );
    }

    Ok(Retriever::new(embedder, Arc::new(index))?)
}

/// Full startup: config, embedder, index, retriever, generation backend
pub(crate) async fn open_pipeline(config: &Config) -> anyhow::Result<Pipeline> {
    let retriever = open_retriever(config).await?;
    let llm = LlmProvider::from_config(&config.generation)?;
    info!(
        "Pipeline ready: model={} top_k={} threshold={:.2} timeout={}s",
        llm.model_name(),
        config.retrieval.top_k,
        config.retrieval.threshold,
        config.generation.timeout_secs
    );
    Ok(Pipeline::new(retriever, Arc::new(llm), config))
}

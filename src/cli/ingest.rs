//! Ingest command - embed a corpus and rebuild the index

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::config::Config;
use crate::embedding;
use crate::error::RagError;
use crate::index::{IndexStore, Passage};

use super::IndexArgs;

#[derive(Args)]
pub struct IngestArgs {
    /// Newline-delimited UTF-8 corpus; each non-blank line becomes a passage
    pub corpus: PathBuf,

    #[command(flatten)]
    pub index: IndexArgs,

    /// Backend to build (overrides [index].backend)
    #[arg(long, value_parser = ["flat", "hnsw"])]
    pub backend: Option<String>,
}

pub async fn run(args: IngestArgs, mut config: Config, quiet: bool) -> anyhow::Result<()> {
    args.index.apply(&mut config);
    if let Some(backend) = args.backend {
        config.index.backend = backend;
    }

    let text = std::fs::read_to_string(&args.corpus)
        .with_context(|| format!("Failed to read corpus {}", args.corpus.display()))?;
    let passages = Passage::from_text(&text);
    info!("Read {} passages from {}", passages.len(), args.corpus.display());
    if passages.is_empty() {
        return Err(RagError::EmptyCorpus.into());
    }

    let store = IndexStore::new(&config.index.dir, config.index.backend.parse()?);
    if store.exists() {
        info!("Replacing existing index at {}", store.dir().display());
    }

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    progress.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    progress.enable_steady_tick(std::time::Duration::from_millis(100));

    progress.set_message("Loading embedding model...");
    let embedder = embedding::shared(&config.embedding)
        .get()
        .await
        .context("Failed to initialize the embedding model")?;

    progress.set_message(format!("Embedding {} passages...", passages.len()));
    let meta = store.build(&passages, embedder.as_ref()).await;
    progress.finish_and_clear();
    let meta = meta.with_context(|| format!("Failed to build index at {}", store.dir().display()))?;

    if !quiet {
        println!("Index built at {}", store.dir().display());
        println!("  Passages: {}", meta.passage_count);
        println!("  Dimensions: {}", meta.dimensions);
        println!("  Backend: {}", meta.backend_name);
        println!("  Embedding model: {}", meta.embedding_model);
    }

    Ok(())
}

//! grounded - retrieval-augmented answers that refuse instead of guessing
//!
//! A single-binary CLI for ingesting a line-oriented knowledge base and
//! answering questions from it, with out-of-distribution detection and a
//! self-verification pass before any generated answer is returned.

mod backend;
mod cli;
mod config;
mod embedding;
mod error;
mod http;
mod index;
mod llm;
mod pipeline;
mod prompt;
mod retriever;
#[cfg(test)]
mod testing;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "grounded=debug,tower_http=debug,info"
    } else if cli.quiet {
        "warn"
    } else {
        "grounded=info,warn"
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    cli.run().await
}

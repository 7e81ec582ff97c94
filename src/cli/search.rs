//! Search command - retrieval and OOD classification without generation

use clap::Args;

use crate::config::Config;
use crate::retriever::Retrieval;

use super::{open_retriever, IndexArgs, RetrievalArgs};

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    #[command(flatten)]
    pub index: IndexArgs,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

pub async fn run(args: SearchArgs, mut config: Config) -> anyhow::Result<()> {
    args.index.apply(&mut config);
    args.retrieval.apply(&mut config);

    let retriever = open_retriever(&config).await?;
    let retrieval = retriever
        .search(&args.query, config.retrieval.top_k, config.retrieval.threshold)
        .await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&retrieval)?);
    } else {
        print_text(&args.query, &retrieval, config.retrieval.threshold);
    }

    Ok(())
}

fn print_text(query: &str, retrieval: &Retrieval, threshold: f32) {
    println!(
        "\nSearch results for '{}' (top {}):\n",
        query,
        retrieval.passages.len()
    );

    for (i, passage) in retrieval.passages.iter().enumerate() {
        println!("{}. Score: {:.4}", i + 1, passage.score);

        // Truncate text for display
        let display_text = if passage.text.chars().count() > 200 {
            format!("{}...", passage.text.chars().take(200).collect::<String>())
        } else {
            passage.text.clone()
        };
        println!("   [{}] {}", passage.line_no, display_text);
        println!();
    }

    println!(
        "max_score={:.4} threshold={:.2} -> {}",
        retrieval.max_score,
        threshold,
        if retrieval.is_ood { "out of distribution" } else { "in distribution" }
    );
}

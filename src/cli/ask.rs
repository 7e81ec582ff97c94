//! Ask command - grounded question answering

use clap::Args;

use crate::config::Config;
use crate::pipeline::{AskResponse, Pipeline};

use super::{open_pipeline, IndexArgs, RetrievalArgs};

#[derive(Args)]
pub struct AskArgs {
    /// Question to ask (omit for interactive mode)
    pub query: Option<String>,

    #[command(flatten)]
    pub index: IndexArgs,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,

    /// Generation provider (overrides [generation].provider)
    #[arg(long, value_parser = ["ollama", "openai", "command"])]
    pub llm: Option<String>,

    /// Generation model name (overrides [generation].model)
    #[arg(long)]
    pub model: Option<String>,

    /// Seconds before a completion call is abandoned (overrides [generation].timeout_secs)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Interactive chat mode
    #[arg(short, long)]
    pub interactive: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

pub async fn run(args: AskArgs, mut config: Config) -> anyhow::Result<()> {
    args.index.apply(&mut config);
    args.retrieval.apply(&mut config);
    if let Some(llm) = &args.llm {
        config.generation.provider = llm.clone();
    }
    if let Some(model) = &args.model {
        config.generation.model = model.clone();
    }
    if let Some(timeout) = args.timeout {
        config.generation.timeout_secs = timeout;
    }

    let json = args.format == "json";

    if args.interactive {
        let pipeline = open_pipeline(&config).await?;
        return run_interactive(&pipeline, json).await;
    }

    let query = args.query.ok_or_else(|| {
        anyhow::anyhow!("Query required in non-interactive mode. Use -i for interactive mode.")
    })?;

    let pipeline = open_pipeline(&config).await?;
    ask_question(&pipeline, &query, json).await
}

async fn ask_question(pipeline: &Pipeline, query: &str, json: bool) -> anyhow::Result<()> {
    let answer = pipeline.answer(query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&AskResponse::from(answer))?);
    } else {
        println!("\nAnswer:\n{}", answer.text);
        if !answer.verified {
            tracing::debug!(
                "Unverified answer (is_ood={}, max_score={:.4})",
                answer.is_ood,
                answer.retrieval.max_score
            );
        }
    }
    Ok(())
}

async fn run_interactive(pipeline: &Pipeline, json: bool) -> anyhow::Result<()> {
    use std::io::{self, BufRead, Write};

    println!("\nInteractive mode. Type 'quit' or 'exit' to leave.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("You: ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input == "quit" || input == "exit" {
            println!("Goodbye!");
            break;
        }

        if let Err(e) = ask_question(pipeline, input, json).await {
            eprintln!("\nError: {:#}\n", e);
        }
        println!();
    }

    Ok(())
}

//! One-shot command line client.
//!
//! Reads document files as UTF-8 text, asks one question, prints the answer to stdout. Ctrl-C
//! cancels the in-flight request.
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use askdocs::{
    config,
    context::Excerpt,
    logging,
    orchestrator::{AnswerOptions, Orchestrator, cancel_pair},
};
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "ask",
    about = "Ask a question about local documents through a text-generation backend"
)]
struct Cli {
    /// Backend identifier (perplexity, openai, gemini, huggingface, deepseek).
    #[arg(long)]
    provider: Option<String>,
    /// Model identifier; the backend default when omitted.
    #[arg(long)]
    model: Option<String>,
    /// API key; falls back to <PROVIDER>_API_KEY.
    #[arg(long)]
    api_key: Option<String>,
    /// Document to include as context. Repeatable.
    #[arg(long = "file", value_name = "PATH")]
    files: Vec<PathBuf>,
    /// Per-call timeout override.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Question to ask.
    #[arg(required = true, num_args = 1..)]
    message: Vec<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init_config().context("failed to load configuration")?;
    logging::init_tracing("warn", false);

    let excerpts = cli
        .files
        .iter()
        .map(|path| read_excerpt(path))
        .collect::<Result<Vec<_>>>()?;

    let (cancel, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let orchestrator =
        Orchestrator::from_config(&config).context("failed to build HTTP transport")?;
    let options = AnswerOptions {
        provider: cli.provider,
        model: cli.model,
        credential: cli.api_key,
        timeout: cli.timeout_secs.map(Duration::from_secs),
        cancel: Some(signal),
    };
    let message = cli.message.join(" ");
    let answer = orchestrator
        .answer(&message, excerpts, options)
        .await
        .context("no answer")?;
    println!("{answer}");
    Ok(())
}

fn read_excerpt(path: &Path) -> Result<Excerpt> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {} as UTF-8 text", path.display()))?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
    Ok(Excerpt::new(name, text))
}

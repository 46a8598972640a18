use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::time::Duration;

use crate::config::AppConfig;
use crate::service::{Answer, QAService, QAServiceBuilder};

const PROMPT: &str = "❓ Question: ";

/// Build the index, ask one question, print the answer and return.
pub async fn run_interactive(config: &AppConfig, question: Option<String>) -> Result<()> {
    let service = build_with_spinner(config).await?;

    let result = answer_once(&service, question).await;
    if let Err(e) = service.close().await {
        log::warn!("Failed to release the index: {}", e);
    }
    result
}

async fn answer_once(service: &QAService, question: Option<String>) -> Result<()> {
    let question = match question {
        Some(question) => question,
        None => match read_question().await? {
            Some(question) => question,
            None => return Ok(()),
        },
    };

    let answer = service
        .answer(&question)
        .await
        .context("Error processing the question")?;
    print_answer(&answer, service.return_sources());
    Ok(())
}

async fn build_with_spinner(config: &AppConfig) -> Result<QAService> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Indexing {}", config.source_path.display()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = QAServiceBuilder::from_config(config).build().await;
    match &result {
        Ok(service) => spinner.finish_with_message(format!(
            "Indexed {} chunks with {}",
            service.chunk_count(),
            service.embedding_model()
        )),
        Err(_) => spinner.finish_and_clear(),
    }
    result.context("Initialization failed")
}

/// `None` when the user cancels with Ctrl-C or Ctrl-D.
async fn read_question() -> Result<Option<String>> {
    tokio::task::spawn_blocking(|| -> Result<Option<String>> {
        let mut rl = Editor::<(), DefaultHistory>::new()?;
        loop {
            match rl.readline(PROMPT) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => return Ok(Some(line.trim().to_string())),
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    return Ok(None);
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    return Ok(None);
                }
                Err(err) => return Err(err.into()),
            }
        }
    })
    .await?
}

fn print_answer(answer: &Answer, show_sources: bool) {
    println!("\n{}", answer.result.bright_green());

    if show_sources {
        println!("\n📄 Sources:");
        for source in &answer.sources {
            println!(
                "  [{}] {} @{} (score {:.3})",
                source.chunk.index,
                source.chunk.source.bright_yellow(),
                source.chunk.offset,
                source.score
            );
        }
    }
}

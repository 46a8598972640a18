use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use docqa::api;
use docqa::commands::run_interactive;
use docqa::config::{AppConfig, LlmProviderKind, ProviderConfig};
use docqa::service::{QAServiceBuilder, ServiceLifecycle};
use dotenv::dotenv;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Answer questions about a text document", long_about = None)]
struct Args {
    /// Serve the HTTP API instead of asking a single question on the console.
    #[arg(long)]
    api: bool,

    #[arg(long, env = "DOCQA_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "DOCQA_PORT", default_value = "5000")]
    port: u16,

    /// Text file to index (overrides DOCQA_SOURCE_PATH).
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Language model backend: openai, deepseek, openrouter, gateway or echo.
    #[arg(long)]
    provider: Option<String>,

    /// Embedding backend: openai or lexical.
    #[arg(long)]
    embedding_provider: Option<String>,

    /// API key for the language model backend.
    #[arg(short, long)]
    api_key: Option<String>,

    /// Ask this question instead of prompting for one.
    #[arg(short, long)]
    question: Option<String>,

    /// Include the retrieved chunks with every answer.
    #[arg(long)]
    sources: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    let default_level = if args.api { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = load_config(&args)?;

    let result = if args.api {
        run_api_server(config, &args.host, args.port).await
    } else {
        run_interactive(&config, args.question.clone()).await
    };

    if let Err(e) = result {
        eprintln!("{}", format!("{:#}", e).red());
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::from_env().context("Invalid configuration")?;

    if let Some(provider) = &args.provider {
        let provider: LlmProviderKind = provider.parse()?;
        config = config.with_llm_provider(provider, ProviderConfig::from_env(provider)?);
    }
    if let Some(provider) = &args.embedding_provider {
        config.embedding.provider = provider.parse()?;
    }
    if let Some(api_key) = &args.api_key {
        config = config.with_api_key(api_key.clone());
    }
    if let Some(source) = &args.source {
        config.source_path = source.clone();
    }
    if args.sources {
        config.return_sources = true;
    }
    Ok(config)
}

async fn run_api_server(config: AppConfig, host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    log::info!("Listening on {}", addr);

    // Index once; requests that arrive meanwhile are told the service is not ready.
    let build = QAServiceBuilder::from_config(&config).build();
    api::serve(listener, ServiceLifecycle::new(), &config.cors_origins, build).await
}

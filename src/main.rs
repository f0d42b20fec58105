use anyhow::Result;
use clap::Parser;
use portfolio_assistant::{ChatResolver, Locale, ResolverConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "portfolio-assistant")]
#[command(about = "Answers questions about the portfolio from its knowledge base")]
struct Args {
    /// The visitor question in natural language
    query: String,

    /// Path to the knowledge base JSON document
    #[arg(short, long, default_value = "data/knowledge_base.json")]
    knowledge_base: PathBuf,

    /// Display language: en or ko
    #[arg(short, long, default_value = "en")]
    lang: String,

    /// Generative-language API key (or set PORTFOLIO_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let locale = Locale::parse(&args.lang);
    let api_key = args
        .api_key
        .or_else(|| std::env::var("PORTFOLIO_API_KEY").ok())
        .unwrap_or_default();

    info!(lang = locale.code(), "Portfolio assistant starting");

    let config = ResolverConfig::new(args.knowledge_base)
        .with_locale(locale)
        .with_llm_api_key(api_key);
    let resolver = ChatResolver::new(config);

    resolver.load_knowledge().await?;
    let response = resolver.respond(&args.query).await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

use anyhow::Result;
use axum::Router;
use clap::Parser;
use retrieval::EngineConfig;
use server::{build_app, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Folder of .txt documents
    #[arg(long, default_value = "./corpus")]
    corpus: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Largest edit distance for vocabulary spelling fallback
    #[arg(long, default_value_t = 2)]
    max_edit_distance: usize,
    /// Vocabulary terms inspected per misspelled word
    #[arg(long, default_value_t = 1000)]
    fallback_candidates: usize,
    /// Characters of document text shown per hit
    #[arg(long, default_value_t = 300)]
    preview_chars: usize,
    /// Spelling dictionary, one `word count` pair per line
    #[arg(long)]
    dictionary: Option<PathBuf>,
    /// Skip computing Soundex codes for documents
    #[arg(long, default_value_t = false)]
    no_phonetic: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let engine = EngineConfig {
        max_edit_distance: args.max_edit_distance,
        fallback_candidates: args.fallback_candidates,
        phonetic: !args.no_phonetic,
        preview_chars: args.preview_chars,
    };
    let app: Router = build_app(ServerConfig::from_env(&args.corpus, engine, args.dictionary))?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

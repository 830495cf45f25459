use anyhow::{Context, Result};
use clap::Parser;
use studio_workspace::{server, SharedProjectStore};
use tracing_subscriber::EnvFilter;

/// Studio persistence server - in-memory patch store for the builder
#[derive(Parser, Debug)]
#[command(name = "studio-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "3030")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let store = SharedProjectStore::default();
    let app = server::router(store);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Persistence server listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

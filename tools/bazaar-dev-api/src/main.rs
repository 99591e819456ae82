use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use bazaar_dev_api::{serve, AppState, Seed};

#[derive(Parser)]
#[command(name = "bazaar-dev-api", about = "In-memory Bazaar backend for local development")]
struct Cli {
    /// HTTP port to listen on.
    #[arg(long, default_value_t = 4000)]
    port: u16,

    /// JSON file with initial users and products.
    #[arg(long)]
    seed: Option<PathBuf>,
}

fn load_seed(path: Option<&PathBuf>) -> anyhow::Result<Seed> {
    let Some(path) = path else {
        return Ok(Seed::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let seed: Seed = serde_json::from_str(&raw)
        .with_context(|| format!("parsing seed file {}", path.display()))?;
    tracing::info!(
        users = seed.users.len(),
        products = seed.products.len(),
        "seed loaded"
    );
    Ok(seed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let state = AppState::new(load_seed(cli.seed.as_ref())?);

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("bazaar-dev-api listening on http://{addr}");

    serve(listener, state).await.context("server error")
}

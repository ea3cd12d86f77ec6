use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use axum::Router;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use dotless::fs::{LocalStore, NoDotStore};
use dotless::server::{self, AppState, state::LISTEN_PORT};

#[derive(Parser)]
#[command(
    name = "dotless",
    author,
    version,
    about = "Serve a directory over HTTP without exposing dot files.",
    long_about = None
)]
struct Cli {
    /// the dir to serve
    #[arg(long, value_name = "PATH", default_value = ".", value_hint = clap::ValueHint::DirPath)]
    dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let dir = cli.dir;
    if !dir.exists() {
        anyhow::bail!("path does not exist: {}", dir.display());
    }
    if !std::fs::metadata(&dir).map(|m| m.is_dir()).unwrap_or(false) {
        anyhow::bail!("path is not a directory: {}", dir.display());
    }

    let state = AppState::new(NoDotStore::new(LocalStore::new(dir.clone())));
    let app: Router = server::build_router(state);
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, LISTEN_PORT));
    tracing::info!("serving \"{}\" on {}", dir.display(), addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use bms_core::bridge::{router, DEFAULT_PDO_PATH};

#[derive(Debug, Parser)]
#[command(name = "bms_server", about = "Serve BMS process data over HTTP")]
struct Cli {
    /// Shared-memory PDO image written by the BMS daemon.
    #[arg(long, default_value = DEFAULT_PDO_PATH)]
    pdo_path: PathBuf,
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    info!(
        target: "bms::bridge",
        bind = %cli.bind,
        pdo_path = %cli.pdo_path.display(),
        "BMS bridge ready"
    );
    axum::serve(listener, router(cli.pdo_path)).await
}

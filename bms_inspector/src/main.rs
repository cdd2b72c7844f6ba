use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use bms_core::load_display_tables;
use bms_runtime::{CommandDispatcher, HttpCommandTransport};
use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;

mod app;
mod poll;
mod ui;

use app::InspectorApp;
use poll::{run_poll_loop, PollEvent, Poller};

#[derive(Clone)]
struct ChannelWriter {
    sender: Sender<String>,
}

impl std::io::Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(text) = String::from_utf8(buf.to_vec()) {
            let _ = self.sender.send(text);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal dashboard for the BMS telemetry bridge", long_about = None)]
struct Cli {
    /// Base URL of the bridge serving `/api/bmsdata` and `/api/cmd`.
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    endpoint: String,
    /// Poll period in milliseconds.
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
    /// Per-request timeout in milliseconds.
    #[arg(long, default_value_t = 900)]
    timeout_ms: u64,
    /// Display tables JSON; overrides `BMS_TABLES_PATH`.
    #[arg(long)]
    tables: Option<PathBuf>,
}

/// Surface the UI thread's error, or its panic, as the process result.
fn join_ui(handle: JoinHandle<Result<()>>) -> Result<()> {
    handle
        .join()
        .map_err(|_| eyre!("inspector UI thread panicked"))?
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let (log_tx, log_rx) = mpsc::channel::<String>();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .with_writer(move || ChannelWriter {
            sender: log_tx.clone(),
        })
        .init();

    let cli = Cli::parse();
    let (tables, metadata) = load_display_tables(cli.tables.clone());
    if let Some(path) = metadata.path() {
        info!("Display tables loaded from {}", path.display());
    }

    let timeout = Duration::from_millis(cli.timeout_ms);
    let poller = Poller::new(&cli.endpoint, timeout, tables.clone())?;
    let (dispatcher, outcomes) =
        CommandDispatcher::spawn(HttpCommandTransport::new(&cli.endpoint, timeout));
    info!("Polling {} every {} ms", cli.endpoint, cli.interval_ms);

    let (sender, receiver) = unbounded_channel::<PollEvent>();
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let ui_handle = std::thread::spawn(move || -> color_eyre::Result<()> {
        let app = InspectorApp::new(receiver, dispatcher, outcomes, shutdown_tx, log_rx, tables)?;
        app.run()
    });

    run_poll_loop(
        poller,
        Duration::from_millis(cli.interval_ms.max(1)),
        sender,
        shutdown_rx,
    )
    .await;

    join_ui(ui_handle)
}

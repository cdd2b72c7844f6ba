use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use bms_core::{render_cbor, DisplayTables, RenderModel};
use bms_proto::ProtoError;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("telemetry endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("telemetry endpoint answered {0}")]
    Status(StatusCode),
    #[error("telemetry payload could not be decoded: {0}")]
    Decode(#[from] ProtoError),
}

/// Outcome of one poll cycle, delivered to the UI thread.
#[derive(Debug)]
pub enum PollEvent {
    Model(Box<RenderModel>),
    Failed(String),
}

pub struct Poller {
    client: Client,
    url: String,
    tables: Arc<DisplayTables>,
}

impl Poller {
    pub fn new(
        endpoint: &str,
        timeout: Duration,
        tables: Arc<DisplayTables>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/api/bmsdata", endpoint.trim_end_matches('/')),
            tables,
        })
    }

    pub async fn fetch(&self) -> Result<RenderModel, FetchError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = response.bytes().await?;
        Ok(render_cbor(&body, &self.tables)?)
    }
}

/// Fixed-period poll loop.
///
/// Each cycle awaits its fetch before the next tick is taken; ticks missed
/// meanwhile are skipped, so cycles never overlap.
pub async fn run_poll_loop(
    poller: Poller,
    period: Duration,
    sender: UnboundedSender<PollEvent>,
    shutdown: Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        match shutdown.try_recv() {
            Ok(()) => {
                info!(target: "bms::poll", "Inspector requested shutdown");
                break;
            }
            Err(TryRecvError::Disconnected) => {
                warn!(target: "bms::poll", "Inspector exited without shutdown signal");
                break;
            }
            Err(TryRecvError::Empty) => {}
        }

        let event = match poller.fetch().await {
            Ok(model) => {
                debug!(target: "bms::poll", packs = model.packs.len(), "poll.ok");
                PollEvent::Model(Box::new(model))
            }
            Err(err) => {
                warn!(target: "bms::poll", error = %err, "poll.failed");
                PollEvent::Failed(err.to_string())
            }
        };
        if sender.send(event).is_err() {
            break;
        }
    }
}

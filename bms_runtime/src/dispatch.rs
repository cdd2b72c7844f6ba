use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use reqwest::blocking::Client;
use thiserror::Error;
use tracing::{info, warn};

use crate::{CommandError, CommandRequest};

/// Delivers one command to the control endpoint.
pub trait CommandTransport: Send + 'static {
    fn post(&mut self, request: &CommandRequest) -> Result<(), DispatchError>;
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("command endpoint unreachable: {0}")]
    Transport(String),
    #[error("command endpoint answered HTTP {0}")]
    Status(u16),
}

/// Result of a single delivery attempt, reported on the outcome channel.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub request: CommandRequest,
    pub result: Result<(), DispatchError>,
}

impl DispatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fire-and-forget command queue.
///
/// `dispatch` never blocks on the network. A background pump delivers each
/// request at most once and reports the outcome; nothing is retried.
#[derive(Clone)]
pub struct CommandDispatcher {
    sender: Sender<CommandRequest>,
}

impl CommandDispatcher {
    pub fn spawn<T: CommandTransport>(transport: T) -> (Self, Receiver<DispatchOutcome>) {
        let (sender, receiver) = unbounded::<CommandRequest>();
        let (outcome_tx, outcome_rx) = unbounded::<DispatchOutcome>();
        thread::spawn(move || run_command_pump(transport, receiver, outcome_tx));
        (Self { sender }, outcome_rx)
    }

    pub fn dispatch(&self, cmd: &str, pack: Option<&str>) -> Result<(), CommandError> {
        let request = CommandRequest::new(cmd, pack)?;
        self.submit(request)
    }

    pub fn submit(&self, request: CommandRequest) -> Result<(), CommandError> {
        self.sender
            .send(request)
            .map_err(|_| CommandError::DispatcherClosed)
    }
}

fn run_command_pump<T: CommandTransport>(
    mut transport: T,
    receiver: Receiver<CommandRequest>,
    outcomes: Sender<DispatchOutcome>,
) {
    for request in receiver {
        let result = transport.post(&request);
        match &result {
            Ok(()) => info!(cmd = %request.cmd, pack = ?request.pack, "command.sent"),
            Err(err) => warn!(
                cmd = %request.cmd,
                pack = ?request.pack,
                error = %err,
                "command.failed"
            ),
        }
        // Nobody listening for outcomes is fine; the log line above stands.
        let _ = outcomes.send(DispatchOutcome { request, result });
    }
}

/// `POST {base}/api/cmd` with a JSON body.
pub struct HttpCommandTransport {
    url: String,
    timeout: Duration,
    client: Option<Client>,
}

impl HttpCommandTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            url: format!("{}/api/cmd", base_url.trim_end_matches('/')),
            timeout,
            client: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CommandTransport for HttpCommandTransport {
    fn post(&mut self, request: &CommandRequest) -> Result<(), DispatchError> {
        // Built on the pump thread: the blocking client must stay out of async contexts.
        let client = match self.client.take() {
            Some(client) => client,
            None => Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|err| DispatchError::Transport(err.to_string()))?,
        };
        let sent = client.post(&self.url).json(request).send();
        self.client = Some(client);

        let response = sent.map_err(|err| DispatchError::Transport(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DispatchError::Status(status.as_u16()))
        }
    }
}

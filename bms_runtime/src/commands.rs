use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of a `POST /api/cmd` request.
///
/// `pack == None` addresses the whole cluster and serialises as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub cmd: String,
    pub pack: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command name")]
    EmptyName,
    #[error("invalid command name '{0}': expected lowercase letters, digits or '_'")]
    InvalidName(String),
    #[error("empty pack name for command '{0}'")]
    EmptyPack(String),
    #[error("command dispatcher stopped")]
    DispatcherClosed,
}

impl CommandRequest {
    /// Build a request after checking its syntax.
    ///
    /// Only the shape is checked; whether the BMS accepts the command in its
    /// current state is up to the BMS.
    pub fn new(
        cmd: impl Into<String>,
        pack: Option<impl Into<String>>,
    ) -> Result<Self, CommandError> {
        let cmd = cmd.into();
        if cmd.is_empty() {
            return Err(CommandError::EmptyName);
        }
        if !cmd
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        {
            return Err(CommandError::InvalidName(cmd));
        }
        let pack = pack.map(Into::into);
        if matches!(pack.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(CommandError::EmptyPack(cmd));
        }
        Ok(Self { cmd, pack })
    }

    pub fn cluster(cmd: impl Into<String>) -> Result<Self, CommandError> {
        Self::new(cmd, None::<String>)
    }

    pub fn is_cluster_wide(&self) -> bool {
        self.pack.is_none()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Cluster-wide MOSFET commands offered on the global panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkCommand {
    ChargeOn,
    ChargeOff,
    DischargeOn,
    DischargeOff,
}

impl BulkCommand {
    pub const ALL: [BulkCommand; 4] = [
        BulkCommand::ChargeOn,
        BulkCommand::ChargeOff,
        BulkCommand::DischargeOn,
        BulkCommand::DischargeOff,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BulkCommand::ChargeOn => "charge_on_all",
            BulkCommand::ChargeOff => "charge_off_all",
            BulkCommand::DischargeOn => "discharge_on_all",
            BulkCommand::DischargeOff => "discharge_off_all",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BulkCommand::ChargeOn => "Charge ON",
            BulkCommand::ChargeOff => "Charge OFF",
            BulkCommand::DischargeOn => "Discharge ON",
            BulkCommand::DischargeOff => "Discharge OFF",
        }
    }

    pub fn request(self) -> CommandRequest {
        CommandRequest {
            cmd: self.name().to_string(),
            pack: None,
        }
    }
}

/// Per-pack switch command: `charge` + on ⇒ `charge_on`.
pub fn switch_command_name(stem: &str, on: bool) -> String {
    format!("{}_{}", stem, if on { "on" } else { "off" })
}

use std::{
    env, fmt, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use thiserror::Error;

pub const BUILTIN_DISPLAY_TABLES: &str = include_str!("data/display_tables.json");
pub const TABLES_PATH_ENV: &str = "BMS_TABLES_PATH";

/// Static label and name tables that give meaning to raw BMS codes.
///
/// The tables are indexed by firmware enum values and bit positions, so they
/// must be versioned together with the firmware that produces the telemetry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DisplayTables {
    pack_names: Vec<String>,
    state_names: Vec<String>,
    alert_labels: Vec<String>,
    mos_switches: Vec<MosSwitch>,
}

/// One MOSFET position in `mosfetStatus`, in bit order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MosSwitch {
    label: String,
    command: String,
}

impl MosSwitch {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Stem of the per-pack commands (`{command}_on` / `{command}_off`).
    pub fn command(&self) -> &str {
        &self.command
    }
}

#[derive(Debug, Error)]
pub enum DisplayTablesError {
    #[error("failed to parse display tables: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read display tables from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("mos switch '{label}' has invalid command stem '{command}'")]
    InvalidCommandStem { label: String, command: String },
}

/// Result of looking up a `stateMachine` code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateName {
    Known(String),
    Unknown(u32),
    Missing,
}

impl StateName {
    pub fn as_known(&self) -> Option<&str> {
        match self {
            StateName::Known(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateName::Known(name) => f.write_str(name),
            StateName::Unknown(code) => write!(f, "UNKNOWN({code})"),
            StateName::Missing => f.write_str("—"),
        }
    }
}

impl DisplayTables {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            DisplayTables::from_json_str(BUILTIN_DISPLAY_TABLES)
                .expect("builtin display tables should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, DisplayTablesError> {
        let tables: DisplayTables = serde_json::from_str(json)?;
        tables.validate()?;
        Ok(tables)
    }

    pub fn from_file(path: &Path) -> Result<Self, DisplayTablesError> {
        let contents = fs::read_to_string(path).map_err(|source| DisplayTablesError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        DisplayTables::from_json_str(&contents)
    }

    fn validate(&self) -> Result<(), DisplayTablesError> {
        for switch in &self.mos_switches {
            let valid = !switch.command.is_empty()
                && switch
                    .command
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
            if !valid {
                return Err(DisplayTablesError::InvalidCommandStem {
                    label: switch.label.clone(),
                    command: switch.command.clone(),
                });
            }
        }
        Ok(())
    }

    /// Table entry for a pack id; ids are 1-based.
    pub fn pack_name(&self, id: u32) -> Option<&str> {
        let index = usize::try_from(id.checked_sub(1)?).ok()?;
        self.pack_names.get(index).map(String::as_str)
    }

    /// `Pack {id} - {name}`, or `Pack {id}` when the table has no entry.
    pub fn pack_display_name(&self, id: u32) -> String {
        match self.pack_name(id) {
            Some(name) => format!("Pack {id} - {name}"),
            None => format!("Pack {id}"),
        }
    }

    pub fn state_name(&self, code: Option<u32>) -> StateName {
        let Some(code) = code else {
            return StateName::Missing;
        };
        match self.state_names.get(code as usize) {
            Some(name) => StateName::Known(name.clone()),
            None => StateName::Unknown(code),
        }
    }

    pub fn alert_labels(&self) -> &[String] {
        &self.alert_labels
    }

    pub fn mos_switches(&self) -> &[MosSwitch] {
        &self.mos_switches
    }
}

#[derive(Debug, Clone)]
pub struct DisplayTablesMetadata {
    path: Option<PathBuf>,
}

impl DisplayTablesMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// File the tables were read from; `None` for the builtin tables.
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

pub fn load_display_tables_from_env() -> (Arc<DisplayTables>, DisplayTablesMetadata) {
    load_display_tables(None)
}

/// Load tables from `override_path`, else `BMS_TABLES_PATH`, else the builtin copy.
///
/// A file that cannot be read or parsed is logged and skipped.
pub fn load_display_tables(
    override_path: Option<PathBuf>,
) -> (Arc<DisplayTables>, DisplayTablesMetadata) {
    let candidate = override_path.or_else(|| env::var(TABLES_PATH_ENV).ok().map(PathBuf::from));

    if let Some(path) = candidate {
        match DisplayTables::from_file(&path) {
            Ok(tables) => {
                tracing::info!(
                    target: "bms::config",
                    path = %path.display(),
                    "display_tables.loaded=file"
                );
                return (Arc::new(tables), DisplayTablesMetadata::new(Some(path)));
            }
            Err(err) => {
                tracing::warn!(
                    target: "bms::config",
                    path = %path.display(),
                    error = %err,
                    "display_tables.load_failed"
                );
            }
        }
    }

    let tables = DisplayTables::builtin();
    tracing::info!(target: "bms::config", "display_tables.loaded=builtin");
    (tables, DisplayTablesMetadata::new(None))
}

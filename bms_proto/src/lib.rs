//! Wire contract for BMS telemetry.
//!
//! The telemetry endpoint publishes a CBOR map `{ "glob": ..., "pack": [...] }`
//! mirroring the process data objects written by the BMS daemon. Every field is
//! optional on the wire; resolving presence is left to the consumer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod pdo;

pub use pdo::{
    parse_pdo, GLOBAL_PDO_SIZE, MAX_BATTERY_PACKS, NTC_COUNT, NUMBER_OF_CELLS, PACK_PDO_SIZE,
};

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("cbor decode failed: {0}")]
    Decode(String),
    #[error("cbor encode failed: {0}")]
    Encode(String),
    #[error("json codec failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("pdo layout mismatch: expected {expected} bytes, got {actual}")]
    Layout { expected: usize, actual: usize },
    #[error("pdo declares {count} packs, at most {max} supported")]
    PackCount { count: u32, max: usize },
}

/// Cluster-wide block published ahead of the pack array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawGlobal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_packs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPack {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_machine: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alive_counter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spi_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_alert_flags: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_warning_flags: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_status: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_alert_flags: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_alert_state: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_alert_cell_under_overvoltage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_alert_aux: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_balancer_timer: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_balancer_status: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mosfet_status: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precharge_resistor_i2t: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast_current: Option<f64>,
    pub cells: Vec<f64>,
    pub ntc_temperature: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub die_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pvdd_voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_charge_current: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_discharge_current: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_capacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_capacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_of_charge: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_of_health: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_count: Option<f64>,
}

/// One polling cycle as delivered by `/api/bmsdata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSnapshot {
    #[serde(rename = "glob", skip_serializing_if = "Option::is_none")]
    pub global: Option<RawGlobal>,
    #[serde(rename = "pack")]
    pub packs: Vec<RawPack>,
}

pub fn decode_snapshot_cbor(bytes: &[u8]) -> Result<RawSnapshot, ProtoError> {
    ciborium::de::from_reader(bytes).map_err(|err| ProtoError::Decode(err.to_string()))
}

pub fn encode_snapshot_cbor(snapshot: &RawSnapshot) -> Result<Vec<u8>, ProtoError> {
    let mut buffer = Vec::new();
    ciborium::ser::into_writer(snapshot, &mut buffer)
        .map_err(|err| ProtoError::Encode(err.to_string()))?;
    Ok(buffer)
}

pub fn encode_snapshot_json(snapshot: &RawSnapshot) -> Result<String, ProtoError> {
    Ok(serde_json::to_string(snapshot)?)
}

pub fn decode_snapshot_json(data: &str) -> Result<RawSnapshot, ProtoError> {
    Ok(serde_json::from_str(data)?)
}

use std::num::NonZeroU32;

use bms_proto::{RawGlobal, RawPack, RawSnapshot};

use crate::flags::FlagMask;
use crate::tables::{DisplayTables, StateName};

/// Validated telemetry for one polling cycle.
///
/// Built once from the wire form; everything downstream reads it as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub packs: Vec<Pack>,
    pub global: Option<Global>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub number_of_packs: u32,
    pub voltage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pack {
    pub id: NonZeroU32,
    pub name: String,
    pub state: StateName,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub state_of_charge: Option<f64>,
    pub state_of_health: Option<f64>,
    pub cycle_count: Option<f64>,
    pub available_capacity: Option<f64>,
    pub total_capacity: Option<f64>,
    pub die_temperature: Option<f64>,
    pub pvdd_voltage: Option<f64>,
    /// Raw cell voltages in physical order; non-finite readings are kept in place.
    pub cells: Vec<f64>,
    pub ntc_temperature: Vec<f64>,
    pub alert_flags: FlagMask,
    pub warning_flags: FlagMask,
    pub mosfet_status: FlagMask,
    pub balancer_status: FlagMask,
    pub alive_counter: Option<u32>,
    pub spi_retries: Option<u32>,
}

impl Snapshot {
    /// Packs without a non-zero id are dropped; their order is otherwise kept.
    pub fn from_raw(raw: &RawSnapshot, tables: &DisplayTables) -> Self {
        let packs = raw
            .packs
            .iter()
            .filter_map(|pack| Pack::from_raw(pack, tables))
            .collect();
        let global = raw.global.as_ref().and_then(Global::from_raw);
        Self { packs, global }
    }
}

impl Global {
    /// The cluster block only counts as reported once it carries a pack count.
    fn from_raw(raw: &RawGlobal) -> Option<Self> {
        Some(Self {
            number_of_packs: raw.number_of_packs?,
            voltage: finite(raw.voltage),
        })
    }
}

impl Pack {
    fn from_raw(raw: &RawPack, tables: &DisplayTables) -> Option<Self> {
        let id = NonZeroU32::new(raw.id?)?;
        Some(Self {
            id,
            name: tables.pack_display_name(id.get()),
            state: tables.state_name(raw.state_machine),
            voltage: finite(raw.voltage),
            current: finite(raw.current),
            state_of_charge: finite(raw.state_of_charge),
            state_of_health: finite(raw.state_of_health),
            cycle_count: finite(raw.cycle_count),
            available_capacity: finite(raw.available_capacity),
            total_capacity: finite(raw.total_capacity),
            die_temperature: finite(raw.die_temperature),
            pvdd_voltage: finite(raw.pvdd_voltage),
            cells: raw.cells.clone(),
            ntc_temperature: raw.ntc_temperature.clone(),
            alert_flags: raw.sw_alert_flags.into(),
            warning_flags: raw.sw_warning_flags.into(),
            mosfet_status: raw.mosfet_status.into(),
            balancer_status: raw.hw_balancer_status.into(),
            alive_counter: raw.alive_counter,
            spi_retries: raw.spi_retries,
        })
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

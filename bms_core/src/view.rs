//! Render-ready view of one snapshot: a global panel plus one panel per pack.

use std::num::NonZeroU32;

use bms_runtime::{switch_command_name, BulkCommand, CommandRequest};

use crate::aggregate::{aggregate, CellRange, PackAggregate};
use crate::flags::{decode_flags, DecodedFlags};
use crate::model::{Global, Pack, Snapshot};
use crate::tables::{DisplayTables, StateName};

/// Severity class of a pack header, derived from its state name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderClass {
    NeutralDark,
    Danger,
    Warning,
    Primary,
    Secondary,
}

impl HeaderClass {
    /// Total: anything unmapped, unknown or missing is `Secondary`.
    pub fn for_state(state: &StateName) -> Self {
        match state.as_known() {
            Some("DISABLED") => HeaderClass::NeutralDark,
            Some("ERROR") => HeaderClass::Danger,
            Some("RUN_WARN") => HeaderClass::Warning,
            Some("RUN") => HeaderClass::Primary,
            _ => HeaderClass::Secondary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellTag {
    Max,
    Min,
    Normal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellView {
    /// 1-based position within the pack.
    pub position: usize,
    pub voltage: f64,
    pub tag: CellTag,
}

/// Cluster-wide state of one MOSFET position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MosAggregate {
    FullyOn,
    PartiallyOn,
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosGlobalView {
    pub label: String,
    pub state: MosAggregate,
}

/// An operator action the presentation layer can offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandAction {
    pub label: String,
    pub request: CommandRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosPackView {
    pub label: String,
    pub on: bool,
    pub turn_on: CommandAction,
    pub turn_off: CommandAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalPanel {
    /// Present only once the BMS has reported its cluster block.
    pub cluster: Option<Global>,
    pub stats: PackAggregate,
    pub mos: Vec<MosGlobalView>,
    pub bulk_commands: Vec<CommandAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackPanel {
    pub id: NonZeroU32,
    pub name: String,
    pub header: HeaderClass,
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
    pub alive_counter: Option<u32>,
    pub spi_retries: Option<u32>,
    pub alerts: DecodedFlags,
    pub warnings: DecodedFlags,
    pub mos: Vec<MosPackView>,
    pub cells: Vec<CellView>,
    /// Pack-local max − min; `None` without finite cells.
    pub cell_spread: Option<f64>,
    pub ntc_temperature: Vec<f64>,
    /// 1-based positions of cells the balancer is bleeding.
    pub balancing_cells: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderModel {
    pub global: GlobalPanel,
    pub packs: Vec<PackPanel>,
}

impl RenderModel {
    pub fn has_packs(&self) -> bool {
        !self.packs.is_empty()
    }
}

pub fn build_render_model(snapshot: &Snapshot, tables: &DisplayTables) -> RenderModel {
    let global = GlobalPanel {
        cluster: snapshot.global.clone(),
        stats: aggregate(&snapshot.packs),
        mos: tables
            .mos_switches()
            .iter()
            .enumerate()
            .map(|(bit, switch)| MosGlobalView {
                label: switch.label().to_string(),
                state: mos_aggregate(&snapshot.packs, bit),
            })
            .collect(),
        bulk_commands: BulkCommand::ALL
            .into_iter()
            .map(|command| CommandAction {
                label: command.label().to_string(),
                request: command.request(),
            })
            .collect(),
    };

    let packs: Vec<PackPanel> = snapshot
        .packs
        .iter()
        .map(|pack| build_pack_panel(pack, tables))
        .collect();

    tracing::debug!(
        target: "bms::view",
        packs = packs.len(),
        cluster = global.cluster.is_some(),
        "render_model.built"
    );

    RenderModel { global, packs }
}

/// Three-state roll-up of one MOSFET bit across all packs.
pub fn mos_aggregate(packs: &[Pack], bit: usize) -> MosAggregate {
    let on = packs
        .iter()
        .filter(|pack| pack.mosfet_status.is_set(bit))
        .count();
    if on == 0 {
        MosAggregate::Off
    } else if on == packs.len() {
        MosAggregate::FullyOn
    } else {
        MosAggregate::PartiallyOn
    }
}

/// Tag each reading against the pack-local extrema; `Max` wins when they coincide.
pub fn tag_cells(cells: &[f64]) -> Vec<CellView> {
    let range = CellRange::of(cells.iter().copied());
    cells
        .iter()
        .enumerate()
        .map(|(index, &voltage)| {
            let tag = match range {
                Some(range) if voltage == range.max => CellTag::Max,
                Some(range) if voltage == range.min => CellTag::Min,
                _ => CellTag::Normal,
            };
            CellView {
                position: index + 1,
                voltage,
                tag,
            }
        })
        .collect()
}

fn build_pack_panel(pack: &Pack, tables: &DisplayTables) -> PackPanel {
    let mos = tables
        .mos_switches()
        .iter()
        .enumerate()
        .map(|(bit, switch)| MosPackView {
            label: switch.label().to_string(),
            on: pack.mosfet_status.is_set(bit),
            turn_on: switch_action(pack, switch.command(), true),
            turn_off: switch_action(pack, switch.command(), false),
        })
        .collect();

    PackPanel {
        id: pack.id,
        name: pack.name.clone(),
        header: HeaderClass::for_state(&pack.state),
        state: pack.state.clone(),
        voltage: pack.voltage,
        current: pack.current,
        state_of_charge: pack.state_of_charge,
        state_of_health: pack.state_of_health,
        cycle_count: pack.cycle_count,
        available_capacity: pack.available_capacity,
        total_capacity: pack.total_capacity,
        die_temperature: pack.die_temperature,
        pvdd_voltage: pack.pvdd_voltage,
        alive_counter: pack.alive_counter,
        spi_retries: pack.spi_retries,
        alerts: decode_flags(pack.alert_flags, tables.alert_labels()),
        warnings: decode_flags(pack.warning_flags, tables.alert_labels()),
        mos,
        cells: tag_cells(&pack.cells),
        cell_spread: CellRange::of(pack.cells.iter().copied()).map(|range| range.spread()),
        ntc_temperature: pack.ntc_temperature.clone(),
        balancing_cells: pack
            .balancer_status
            .active_indices()
            .filter(|&index| index < pack.cells.len())
            .map(|index| index + 1)
            .collect(),
    }
}

fn switch_action(pack: &Pack, stem: &str, on: bool) -> CommandAction {
    CommandAction {
        label: if on { "ON" } else { "OFF" }.to_string(),
        request: CommandRequest {
            cmd: switch_command_name(stem, on),
            pack: Some(pack.name.clone()),
        },
    }
}

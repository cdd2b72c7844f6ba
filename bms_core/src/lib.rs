//! Core of the BMS telemetry dashboard.
//!
//! Turns one raw snapshot from the BMS bridge into a [`RenderModel`]: flag
//! decoding, cell extremum lookup and cross-pack aggregation. Everything here
//! is a pure function of its inputs; polling and presentation live in
//! `bms_inspector`.

pub mod aggregate;
pub mod bridge;
pub mod flags;
pub mod locate;
pub mod model;
pub mod tables;
pub mod view;

#[cfg(test)]
mod test_support;

pub use aggregate::{aggregate, mean, sum, CellExtremum, CellRange, PackAggregate};
pub use flags::{decode_flags, DecodedFlags, FlagMask};
pub use locate::{locate, CellLocation};
pub use model::{Global, Pack, Snapshot};
pub use tables::{
    load_display_tables, load_display_tables_from_env, DisplayTables, DisplayTablesError,
    DisplayTablesMetadata, MosSwitch, StateName, BUILTIN_DISPLAY_TABLES, TABLES_PATH_ENV,
};
pub use view::{
    build_render_model, mos_aggregate, tag_cells, CellTag, CellView, CommandAction, GlobalPanel,
    HeaderClass, MosAggregate, MosGlobalView, MosPackView, PackPanel, RenderModel,
};

/// Decode a CBOR body from the bridge straight into a render model.
pub fn render_cbor(
    bytes: &[u8],
    tables: &DisplayTables,
) -> Result<RenderModel, bms_proto::ProtoError> {
    let raw = bms_proto::decode_snapshot_cbor(bytes)?;
    Ok(build_render_model(&Snapshot::from_raw(&raw, tables), tables))
}

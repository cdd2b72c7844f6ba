use bms_proto::{RawPack, RawSnapshot};

use crate::model::{Pack, Snapshot};
use crate::tables::DisplayTables;

/// A pack with only its id set, named through the builtin tables.
pub(crate) fn pack(id: u32) -> Pack {
    pack_with_cells(id, &[])
}

pub(crate) fn pack_with_cells(id: u32, cells: &[f64]) -> Pack {
    let raw = RawSnapshot {
        global: None,
        packs: vec![RawPack {
            id: Some(id),
            cells: cells.to_vec(),
            ..RawPack::default()
        }],
    };
    Snapshot::from_raw(&raw, &DisplayTables::builtin())
        .packs
        .pop()
        .expect("pack id must be non-zero")
}

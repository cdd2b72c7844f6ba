use std::fmt;

use crate::model::Pack;

/// Where a cell reading was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellLocation {
    /// `cell` is 1-based, as printed on the pack.
    At { pack: String, cell: usize },
    Unknown,
}

impl fmt::Display for CellLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellLocation::At { pack, cell } => write!(f, "{pack} (C{cell})"),
            CellLocation::Unknown => f.write_str("—"),
        }
    }
}

/// First pack/cell, in snapshot order, whose raw reading equals `target`.
///
/// The comparison is exact: `target` must come from the same readings, never
/// from a recomputed or rounded value.
pub fn locate(packs: &[Pack], target: f64) -> CellLocation {
    for pack in packs {
        if let Some(index) = pack.cells.iter().position(|&value| value == target) {
            return CellLocation::At {
                pack: pack.name.clone(),
                cell: index + 1,
            };
        }
    }
    CellLocation::Unknown
}

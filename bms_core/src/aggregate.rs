//! Cross-pack statistics.
//!
//! Means and sums over nothing are `0.0` so the view stays renderable; cell
//! extrema over nothing are `None`.

use crate::locate::{locate, CellLocation};
use crate::model::Pack;

#[derive(Debug, Clone, PartialEq)]
pub struct CellExtremum {
    pub value: f64,
    pub location: CellLocation,
}

/// Smallest and largest finite reading of a cell set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellRange {
    pub min: f64,
    pub max: f64,
}

impl CellRange {
    pub fn of<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |range, value| {
                Some(match range {
                    None => CellRange {
                        min: value,
                        max: value,
                    },
                    Some(CellRange { min, max }) => CellRange {
                        min: min.min(value),
                        max: max.max(value),
                    },
                })
            })
    }

    pub fn spread(&self) -> f64 {
        self.max - self.min
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackAggregate {
    pub mean_voltage: f64,
    pub sum_current: f64,
    pub mean_temperature: f64,
    pub max_cell: Option<CellExtremum>,
    pub min_cell: Option<CellExtremum>,
    pub mean_soc: f64,
    pub mean_soh: f64,
    pub packs_with_error: Vec<String>,
    pub packs_with_warning: Vec<String>,
}

pub fn aggregate(packs: &[Pack]) -> PackAggregate {
    let cells = CellRange::of(packs.iter().flat_map(|pack| pack.cells.iter().copied()));
    let extremum = |value: f64| CellExtremum {
        value,
        location: locate(packs, value),
    };

    PackAggregate {
        mean_voltage: mean(packs.iter().filter_map(|p| p.voltage)),
        sum_current: sum(packs.iter().filter_map(|p| p.current)),
        mean_temperature: mean(packs.iter().flat_map(|p| p.ntc_temperature.iter().copied())),
        max_cell: cells.map(|range| extremum(range.max)),
        min_cell: cells.map(|range| extremum(range.min)),
        mean_soc: mean(packs.iter().filter_map(|p| p.state_of_charge)),
        mean_soh: mean(packs.iter().filter_map(|p| p.state_of_health)),
        packs_with_error: packs
            .iter()
            .filter(|p| !p.alert_flags.is_empty())
            .map(|p| p.name.clone())
            .collect(),
        packs_with_warning: packs
            .iter()
            .filter(|p| !p.warning_flags.is_empty())
            .map(|p| p.name.clone())
            .collect(),
    }
}

/// Mean of the finite values; `0.0` when there are none.
pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (total, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(total, count), v| (total + v, count + 1));
    if count > 0 {
        total / count as f64
    } else {
        0.0
    }
}

pub fn sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(0.0, |total, v| total + v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FlagMask;
    use crate::test_support::{pack, pack_with_cells};

    #[test]
    fn empty_pack_set_is_all_zero() {
        let stats = aggregate(&[]);
        assert_eq!(stats.mean_voltage, 0.0);
        assert_eq!(stats.sum_current, 0.0);
        assert_eq!(stats.mean_temperature, 0.0);
        assert_eq!(stats.mean_soc, 0.0);
        assert_eq!(stats.mean_soh, 0.0);
        assert_eq!(stats.max_cell, None);
        assert_eq!(stats.min_cell, None);
        assert!(stats.packs_with_error.is_empty());
        assert!(stats.packs_with_warning.is_empty());
    }

    #[test]
    fn extrema_span_all_packs_and_are_located() {
        let packs = vec![
            pack_with_cells(1, &[3.30, 3.35, f64::NAN]),
            pack_with_cells(2, &[3.28, 3.36]),
        ];
        let stats = aggregate(&packs);

        let max = stats.max_cell.expect("max cell");
        assert_eq!(max.value, 3.36);
        assert_eq!(
            max.location,
            CellLocation::At {
                pack: "Pack 2 - EVE MB31 314Ah".into(),
                cell: 2
            }
        );
        let min = stats.min_cell.expect("min cell");
        assert_eq!(min.value, 3.28);
        assert_eq!(min.location.to_string(), "Pack 2 - EVE MB31 314Ah (C1)");
    }

    #[test]
    fn packs_without_cells_report_no_extrema() {
        let stats = aggregate(&[pack(1), pack(2)]);
        assert!(stats.max_cell.is_none());
        assert!(stats.min_cell.is_none());
    }

    #[test]
    fn means_skip_absent_fields() {
        let mut first = pack(1);
        first.voltage = Some(52.1);
        first.current = Some(-4.0);
        first.ntc_temperature = vec![20.0, 22.0];
        let mut second = pack(2);
        second.current = Some(1.5);
        second.ntc_temperature = vec![24.0, f64::NAN];

        let stats = aggregate(&[first, second]);
        assert_eq!(stats.mean_voltage, 52.1);
        assert_eq!(stats.sum_current, -2.5);
        assert_eq!(stats.mean_temperature, 22.0);
    }

    #[test]
    fn flagged_packs_are_listed_in_snapshot_order() {
        let mut second = pack(2);
        second.alert_flags = FlagMask::new(1);
        let mut first = pack(1);
        first.alert_flags = FlagMask::new(1 << 19);
        first.warning_flags = FlagMask::new(2);

        let stats = aggregate(&[second, first, pack(3)]);
        assert_eq!(
            stats.packs_with_error,
            vec!["Pack 2 - EVE MB31 314Ah", "Pack 1 - EVE MB31 314Ah"]
        );
        assert_eq!(stats.packs_with_warning, vec!["Pack 1 - EVE MB31 314Ah"]);
    }

    #[test]
    fn cell_range_spread() {
        let range = CellRange::of([3.30, 3.35, 3.32]).expect("range");
        assert_eq!(range.min, 3.30);
        assert_eq!(range.max, 3.35);
        assert!((range.spread() - 0.05).abs() < 1e-12);
        assert_eq!(CellRange::of([f64::NAN]), None);
    }
}

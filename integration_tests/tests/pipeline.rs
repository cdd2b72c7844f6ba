mod common;

use anyhow::Result;
use bms_core::{
    build_render_model, load_display_tables_from_env, render_cbor, CellLocation, CellTag,
    DisplayTables, HeaderClass, MosAggregate, Snapshot,
};
use bms_proto::{decode_snapshot_json, encode_snapshot_cbor, encode_snapshot_json, parse_pdo};

use common::{ensure_test_tables, pdo_image, PackImage};

fn two_pack_image() -> Vec<u8> {
    let mut first = PackImage::new(1);
    first.voltage = 52.25;
    first.state_of_charge = 80.0;
    first.current = -2.5;
    first.mosfet_status = 0b11;
    first.cells[5] = 3.375;

    let mut second = PackImage::new(2);
    second.voltage = 51.75;
    second.state_of_charge = 78.0;
    second.current = 1.0;
    second.mosfet_status = 0b01;
    second.alert_flags = 0b100;
    second.cells[15] = 3.125;

    pdo_image(52.0, &[first, second])
}

#[test]
fn shared_memory_image_renders_through_cbor() -> Result<()> {
    let tables = DisplayTables::builtin();
    let raw = parse_pdo(&two_pack_image())?;
    let body = encode_snapshot_cbor(&raw)?;
    let model = render_cbor(&body, &tables)?;

    let stats = &model.global.stats;
    assert_eq!(stats.mean_voltage, 52.0);
    assert_eq!(stats.mean_soc, 79.0);
    assert_eq!(stats.sum_current, -1.5);
    assert_eq!(stats.mean_temperature, 20.0);
    assert_eq!(stats.packs_with_error, vec!["Pack 2 - EVE MB31 314Ah"]);

    let max = stats.max_cell.as_ref().expect("max cell");
    assert_eq!(max.value, 3.375);
    assert_eq!(max.location.to_string(), "Pack 1 - EVE MB31 314Ah (C6)");
    let min = stats.min_cell.as_ref().expect("min cell");
    assert_eq!(
        min.location,
        CellLocation::At {
            pack: "Pack 2 - EVE MB31 314Ah".into(),
            cell: 16
        }
    );

    let cluster = model.global.cluster.as_ref().expect("cluster block");
    assert_eq!(cluster.number_of_packs, 2);
    assert_eq!(cluster.voltage, Some(52.0));

    // builtin MOS order: precharge, charge, discharge
    assert_eq!(model.global.mos[0].state, MosAggregate::FullyOn);
    assert_eq!(model.global.mos[1].state, MosAggregate::PartiallyOn);
    assert_eq!(model.global.mos[2].state, MosAggregate::Off);

    let first = &model.packs[0];
    assert_eq!(first.cells[5].tag, CellTag::Max);
    assert_eq!(first.cells[0].tag, CellTag::Min);
    assert_eq!(first.total_capacity, Some(314.0));
    assert_eq!(first.alive_counter, Some(1));
    Ok(())
}

#[test]
fn tables_from_environment_rename_packs_and_states() -> Result<()> {
    ensure_test_tables();
    let (tables, metadata) = load_display_tables_from_env();
    assert!(metadata.path().is_some());

    let raw = parse_pdo(&two_pack_image())?;
    let model = build_render_model(&Snapshot::from_raw(&raw, &tables), &tables);

    assert_eq!(model.packs[0].name, "Pack 1 - Rack A");
    assert_eq!(model.packs[0].header, HeaderClass::Primary);
    assert_eq!(model.packs[1].alerts.labels(), ["Overtemperature".to_string()]);
    assert_eq!(model.global.mos.len(), 2);
    assert_eq!(model.global.mos[0].label, "Charge");
    assert_eq!(model.global.mos[0].state, MosAggregate::FullyOn);
    assert_eq!(model.global.mos[1].state, MosAggregate::PartiallyOn);
    assert_eq!(model.packs[1].mos[1].turn_on.request.cmd, "discharge_on");
    Ok(())
}

#[test]
fn json_fixture_with_missing_fields_degrades_gracefully() -> Result<()> {
    let raw = decode_snapshot_json(
        r#"{
            "pack": [
                { "id": 1, "voltage": 52.5, "cells": [3.3, 3.4], "futureField": true },
                { "stateMachine": 11 },
                { "id": 3, "stateMachine": 99, "swWarningFlags": 1 }
            ]
        }"#,
    )?;
    let tables = DisplayTables::builtin();
    let model = build_render_model(&Snapshot::from_raw(&raw, &tables), &tables);

    assert!(model.global.cluster.is_none());
    assert_eq!(model.packs.len(), 2);
    assert_eq!(model.global.stats.mean_voltage, 52.5);
    assert_eq!(model.global.stats.mean_soc, 0.0);
    assert_eq!(model.packs[1].name, "Pack 3");
    assert_eq!(model.packs[1].header, HeaderClass::Secondary);
    assert_eq!(model.packs[1].voltage, None);
    assert_eq!(model.global.stats.packs_with_warning, vec!["Pack 3"]);

    let json = encode_snapshot_json(&raw)?;
    assert!(json.contains("\"pack\""));
    assert!(!json.contains("futureField"));
    Ok(())
}

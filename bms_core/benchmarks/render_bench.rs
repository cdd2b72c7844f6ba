use bms_core::{build_render_model, render_cbor, DisplayTables, Snapshot};
use bms_proto::{
    encode_snapshot_cbor, RawGlobal, RawPack, RawSnapshot, MAX_BATTERY_PACKS, NUMBER_OF_CELLS,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn synthetic_snapshot(pack_count: usize) -> RawSnapshot {
    let packs = (0..pack_count)
        .map(|index| RawPack {
            id: Some(index as u32 + 1),
            state_machine: Some(11),
            sw_alert_flags: Some(if index % 3 == 0 { 1 << 4 } else { 0 }),
            mosfet_status: Some(0b110),
            hw_balancer_status: Some(0b1010),
            voltage: Some(52.0 + index as f64 * 0.1),
            current: Some(-3.0),
            state_of_charge: Some(80.0),
            state_of_health: Some(98.0),
            cells: (0..NUMBER_OF_CELLS)
                .map(|cell| 3.30 + ((index * 7 + cell * 13) % 50) as f64 * 0.001)
                .collect(),
            ntc_temperature: vec![21.0, 22.5, 23.0, 21.5],
            ..RawPack::default()
        })
        .collect();
    RawSnapshot {
        global: Some(RawGlobal {
            number_of_packs: Some(pack_count as u32),
            sync: Some(1),
            voltage: Some(52.0),
        }),
        packs,
    }
}

fn bench_render(c: &mut Criterion) {
    let tables = DisplayTables::builtin();
    let mut group = c.benchmark_group("render_model");

    for packs in [1usize, 4, MAX_BATTERY_PACKS] {
        let raw = synthetic_snapshot(packs);
        let snapshot = Snapshot::from_raw(&raw, &tables);
        group.bench_with_input(BenchmarkId::new("build", packs), &snapshot, |b, snapshot| {
            b.iter(|| build_render_model(snapshot, &tables));
        });

        let Ok(body) = encode_snapshot_cbor(&raw) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::new("from_cbor", packs), &body, |b, body| {
            b.iter(|| render_cbor(body, &tables));
        });
    }

    group.finish();
}

criterion_group!(render_benches, bench_render);
criterion_main!(render_benches);

use crate::{ProtoError, RawGlobal, RawPack, RawSnapshot};

pub const MAX_BATTERY_PACKS: usize = 10;
pub const NUMBER_OF_CELLS: usize = 16;
pub const NTC_COUNT: usize = 4;

/// `numberOfPacks`, `sync`, `voltage`.
pub const GLOBAL_PDO_SIZE: usize = 12;
/// 14 status words followed by 33 floats.
pub const PACK_PDO_SIZE: usize = 14 * 4 + (3 + NUMBER_OF_CELLS + NTC_COUNT + 10) * 4;

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn word(&mut self) -> [u8; 4] {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.bytes[self.offset..self.offset + 4]);
        self.offset += 4;
        buf
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.word())
    }

    fn f32(&mut self) -> f64 {
        f64::from(f32::from_le_bytes(self.word()))
    }

    fn floats(&mut self, count: usize) -> Vec<f64> {
        (0..count).map(|_| self.f32()).collect()
    }
}

/// Parse the shared-memory process data image written by the BMS daemon.
///
/// The global block declares the pack count; the buffer is checked against it
/// before any pack is read.
pub fn parse_pdo(bytes: &[u8]) -> Result<RawSnapshot, ProtoError> {
    if bytes.len() < GLOBAL_PDO_SIZE {
        return Err(ProtoError::Layout {
            expected: GLOBAL_PDO_SIZE,
            actual: bytes.len(),
        });
    }

    let mut reader = Reader::new(bytes);
    let number_of_packs = reader.u32();
    let sync = reader.u32();
    let voltage = reader.f32();

    let count = number_of_packs as usize;
    if count > MAX_BATTERY_PACKS {
        return Err(ProtoError::PackCount {
            count: number_of_packs,
            max: MAX_BATTERY_PACKS,
        });
    }
    let expected = GLOBAL_PDO_SIZE + count * PACK_PDO_SIZE;
    if bytes.len() < expected {
        return Err(ProtoError::Layout {
            expected,
            actual: bytes.len(),
        });
    }

    let packs = (0..count).map(|_| read_pack(&mut reader)).collect();

    Ok(RawSnapshot {
        global: Some(RawGlobal {
            number_of_packs: Some(number_of_packs),
            sync: Some(sync),
            voltage: Some(voltage),
        }),
        packs,
    })
}

fn read_pack(reader: &mut Reader<'_>) -> RawPack {
    let id = reader.u32();
    let state_machine = reader.u32();
    let alive_counter = reader.u32();
    let spi_retries = reader.u32();
    let sw_alert_flags = reader.u32();
    let sw_warning_flags = reader.u32();
    let hw_status = reader.u32();
    let hw_alert_flags = reader.u32();
    let hw_alert_state = reader.u32();
    let hw_alert_cell_under_overvoltage = reader.u32();
    let hw_alert_aux = reader.u32();
    let hw_balancer_timer = reader.u32();
    let hw_balancer_status = reader.u32();
    let mosfet_status = reader.u32();

    let precharge_resistor_i2t = reader.f32();
    let current = reader.f32();
    let fast_current = reader.f32();
    let cells = reader.floats(NUMBER_OF_CELLS);
    let ntc_temperature = reader.floats(NTC_COUNT);

    RawPack {
        id: Some(id),
        state_machine: Some(state_machine),
        alive_counter: Some(alive_counter),
        spi_retries: Some(spi_retries),
        sw_alert_flags: Some(sw_alert_flags),
        sw_warning_flags: Some(sw_warning_flags),
        hw_status: Some(hw_status),
        hw_alert_flags: Some(hw_alert_flags),
        hw_alert_state: Some(hw_alert_state),
        hw_alert_cell_under_overvoltage: Some(hw_alert_cell_under_overvoltage),
        hw_alert_aux: Some(hw_alert_aux),
        hw_balancer_timer: Some(hw_balancer_timer),
        hw_balancer_status: Some(hw_balancer_status),
        mosfet_status: Some(mosfet_status),
        precharge_resistor_i2t: Some(precharge_resistor_i2t),
        current: Some(current),
        fast_current: Some(fast_current),
        cells,
        ntc_temperature,
        die_temperature: Some(reader.f32()),
        voltage: Some(reader.f32()),
        pvdd_voltage: Some(reader.f32()),
        available_charge_current: Some(reader.f32()),
        available_discharge_current: Some(reader.f32()),
        available_capacity: Some(reader.f32()),
        total_capacity: Some(reader.f32()),
        state_of_charge: Some(reader.f32()),
        state_of_health: Some(reader.f32()),
        cycle_count: Some(reader.f32()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_u32(buf: &mut Vec<u8>, value: u32) {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    fn push_f32(buf: &mut Vec<u8>, value: f32) {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    fn pack_image(id: u32, voltage: f32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PACK_PDO_SIZE);
        push_u32(&mut buf, id);
        push_u32(&mut buf, 11);
        for word in 2..14u32 {
            push_u32(&mut buf, if word == 13 { 0b011 } else { 0 });
        }
        push_f32(&mut buf, 0.0);
        push_f32(&mut buf, -1.5);
        push_f32(&mut buf, -1.5);
        for cell in 0..NUMBER_OF_CELLS {
            push_f32(&mut buf, 3.25 + cell as f32 * 0.0078125);
        }
        for ntc in 0..NTC_COUNT {
            push_f32(&mut buf, 20.0 + ntc as f32);
        }
        push_f32(&mut buf, 31.0);
        push_f32(&mut buf, voltage);
        for _ in 0..8 {
            push_f32(&mut buf, 0.5);
        }
        buf
    }

    #[test]
    fn pack_block_size_matches_firmware_struct() {
        assert_eq!(PACK_PDO_SIZE, 188);
        assert_eq!(pack_image(1, 52.0).len(), PACK_PDO_SIZE);
    }

    #[test]
    fn parses_global_and_packs() {
        let mut image = Vec::new();
        push_u32(&mut image, 2);
        push_u32(&mut image, 7);
        push_f32(&mut image, 52.5);
        image.extend(pack_image(1, 52.25));
        image.extend(pack_image(2, 51.75));

        let snapshot = parse_pdo(&image).expect("valid image");
        let global = snapshot.global.expect("global block");
        assert_eq!(global.number_of_packs, Some(2));
        assert_eq!(global.sync, Some(7));
        assert_eq!(global.voltage, Some(52.5));

        assert_eq!(snapshot.packs.len(), 2);
        let second = &snapshot.packs[1];
        assert_eq!(second.id, Some(2));
        assert_eq!(second.state_machine, Some(11));
        assert_eq!(second.mosfet_status, Some(0b011));
        assert_eq!(second.cells.len(), NUMBER_OF_CELLS);
        assert_eq!(second.cells[0], 3.25);
        assert_eq!(second.ntc_temperature, vec![20.0, 21.0, 22.0, 23.0]);
        assert_eq!(second.die_temperature, Some(31.0));
        assert_eq!(second.voltage, Some(51.75));
        assert_eq!(second.cycle_count, Some(0.5));
    }

    #[test]
    fn short_buffer_is_rejected() {
        let mut image = Vec::new();
        push_u32(&mut image, 1);
        push_u32(&mut image, 0);
        push_f32(&mut image, 0.0);
        image.extend(vec![0u8; PACK_PDO_SIZE - 4]);

        match parse_pdo(&image) {
            Err(ProtoError::Layout { expected, actual }) => {
                assert_eq!(expected, GLOBAL_PDO_SIZE + PACK_PDO_SIZE);
                assert_eq!(actual, GLOBAL_PDO_SIZE + PACK_PDO_SIZE - 4);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn pack_count_above_limit_is_rejected() {
        let mut image = Vec::new();
        push_u32(&mut image, 11);
        push_u32(&mut image, 0);
        push_f32(&mut image, 0.0);
        assert!(matches!(
            parse_pdo(&image),
            Err(ProtoError::PackCount { count: 11, .. })
        ));
    }
}

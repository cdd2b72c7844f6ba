#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::Once;
use std::thread;

use bms_proto::{NTC_COUNT, NUMBER_OF_CELLS};

static INIT: Once = Once::new();

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn ensure_test_tables() {
    INIT.call_once(|| {
        let tables_path = fixture_path("test_display_tables.json");

        debug_assert!(
            tables_path.exists(),
            "missing test display tables at {}",
            tables_path.display()
        );

        std::env::set_var(bms_core::TABLES_PATH_ENV, &tables_path);
    });
}

/// One pack block of a shared-memory image.
#[derive(Clone)]
pub struct PackImage {
    pub id: u32,
    pub state: u32,
    pub alert_flags: u32,
    pub warning_flags: u32,
    pub balancer_status: u32,
    pub mosfet_status: u32,
    pub current: f32,
    pub cells: [f32; NUMBER_OF_CELLS],
    pub ntc: [f32; NTC_COUNT],
    pub voltage: f32,
    pub state_of_charge: f32,
    pub state_of_health: f32,
}

impl PackImage {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            state: 3,
            alert_flags: 0,
            warning_flags: 0,
            balancer_status: 0,
            mosfet_status: 0,
            current: 0.0,
            cells: [3.25; NUMBER_OF_CELLS],
            ntc: [20.0; NTC_COUNT],
            voltage: 52.0,
            state_of_charge: 50.0,
            state_of_health: 100.0,
        }
    }

    fn write(&self, buf: &mut Vec<u8>) {
        let words = [
            self.id,
            self.state,
            1,
            0,
            self.alert_flags,
            self.warning_flags,
            0,
            0,
            0,
            0,
            0,
            0,
            self.balancer_status,
            self.mosfet_status,
        ];
        for word in words {
            buf.extend_from_slice(&word.to_le_bytes());
        }
        let mut floats = vec![0.0f32, self.current, self.current];
        floats.extend_from_slice(&self.cells);
        floats.extend_from_slice(&self.ntc);
        floats.extend_from_slice(&[
            30.0,
            self.voltage,
            3.3,
            100.0,
            100.0,
            157.0,
            314.0,
            self.state_of_charge,
            self.state_of_health,
            12.0,
        ]);
        for value in floats {
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
}

pub fn pdo_image(bus_voltage: f32, packs: &[PackImage]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(packs.len() as u32).to_le_bytes());
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.extend_from_slice(&bus_voltage.to_le_bytes());
    for pack in packs {
        pack.write(&mut buf);
    }
    buf
}

/// A captured HTTP request line and body.
pub struct CapturedRequest {
    pub request_line: String,
    pub body: String,
}

/// Accept `count` requests on an ephemeral port, answering each with
/// `status_line`. Returns the base URL and a channel of captured requests.
pub fn capture_server(
    count: usize,
    status_line: &'static str,
) -> (String, Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind capture server");
    let addr = listener.local_addr().expect("capture server addr");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for _ in 0..count {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                return;
            }
            let mut content_length = 0usize;
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).is_err() {
                    return;
                }
                let header = header.trim_end();
                if header.is_empty() {
                    break;
                }
                if let Some((name, value)) = header.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
            }
            let mut body = vec![0u8; content_length];
            if reader.read_exact(&mut body).is_err() {
                return;
            }
            let mut stream = reader.into_inner();
            let response =
                format!("HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            let _ = stream.write_all(response.as_bytes());
            let _ = tx.send(CapturedRequest {
                request_line: request_line.trim_end().to_string(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
    });
    (format!("http://{addr}"), rx)
}

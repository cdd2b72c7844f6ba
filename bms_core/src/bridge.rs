//! HTTP bridge between the BMS shared-memory image and dashboard clients.
//!
//! `GET /api/bmsdata` re-reads the PDO image on every request and answers
//! with a CBOR snapshot. `POST /api/cmd` accepts a command body and logs it;
//! actuation belongs to the BMS process itself.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bms_proto::{encode_snapshot_cbor, parse_pdo, ProtoError};
use bms_runtime::CommandRequest;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_PDO_PATH: &str = "/dev/shm/battery_pdo_shm";
pub const CBOR_CONTENT_TYPE: &str = "application/cbor";

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to read PDO image {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Proto(#[from] ProtoError),
}

#[derive(Debug, Clone)]
struct BridgeState {
    pdo_path: Arc<PathBuf>,
}

pub fn router(pdo_path: PathBuf) -> Router {
    Router::new()
        .route("/api/bmsdata", get(bms_data))
        .route("/api/cmd", post(command))
        .with_state(BridgeState {
            pdo_path: Arc::new(pdo_path),
        })
}

/// Read and re-encode the current PDO image as a CBOR snapshot body.
pub fn snapshot_cbor_from_pdo(path: &Path) -> Result<Vec<u8>, BridgeError> {
    let bytes = std::fs::read(path).map_err(|source| BridgeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = parse_pdo(&bytes)?;
    Ok(encode_snapshot_cbor(&raw)?)
}

async fn bms_data(State(state): State<BridgeState>) -> Response {
    let path = Arc::clone(&state.pdo_path);
    let result = tokio::task::spawn_blocking(move || snapshot_cbor_from_pdo(&path)).await;
    match result {
        Ok(Ok(body)) => ([(header::CONTENT_TYPE, CBOR_CONTENT_TYPE)], body).into_response(),
        Ok(Err(err)) => {
            warn!(target: "bms::bridge", error = %err, "bmsdata.unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response()
        }
        Err(err) => {
            warn!(target: "bms::bridge", error = %err, "bmsdata.task_failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn command(Json(request): Json<CommandRequest>) -> StatusCode {
    info!(
        target: "bms::bridge",
        cmd = %request.cmd,
        pack = request.pack.as_deref().unwrap_or("*"),
        "command.received"
    );
    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_image_reports_read_error() {
        let path = std::env::temp_dir().join("bms_bridge_missing_image.bin");
        let _ = std::fs::remove_file(&path);
        let err = snapshot_cbor_from_pdo(&path).expect_err("missing file");
        assert!(matches!(err, BridgeError::Read { .. }));
    }

    #[test]
    fn truncated_image_reports_layout_error() {
        let path = std::env::temp_dir().join(format!(
            "bms_bridge_truncated_{}.bin",
            std::process::id()
        ));
        std::fs::write(&path, [0u8; 5]).expect("write image");
        let err = snapshot_cbor_from_pdo(&path).expect_err("short image");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, BridgeError::Proto(ProtoError::Layout { .. })));
    }
}

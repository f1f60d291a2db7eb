//! HTTP boundary for the monitoring dashboard.
//!
//! This module provides an HTTP server that:
//! - Reports the latest status snapshot, sensor readings and camera health
//! - Accepts PIR and RFID readings pushed by an external sensor bridge
//! - Serves the event log and per-minute event counts
//! - Streams the annotated live frame as MJPEG
//!
//! # Architecture
//!
//! ```text
//! processing loop ──→ SharedStatus / LiveFrame ──→ GET /status, /video_feed
//! sensor poller   ──→ SensorState              ──→ GET /sensor_status
//! sensor bridge   ──→ POST /update_pir, /update_rfid ──→ SensorState
//! event log file  ─────────────────────────────→ GET /logs, /get_logs, /motion_stats
//! ```
//!
//! Pushed readings only land in [`SensorState`]. The processing loop picks
//! them up with the next frame and writes the PIR and RFID log lines, so the
//! event log keeps a single writer.

use crate::config::ServerConfig;
use crate::core::{LiveFrame, SharedStatus, StatusSnapshot};
use crate::eventlog::{minute_stats, read_lines, MinuteCount, SharedRunStats};
use crate::sensors::{parse_pir, parse_rfid, SensorError, SensorReadings, SensorState};
use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// A camera counts as active if a frame was processed this recently.
const CAMERA_STALE_SECS: i64 = 5;

/// How often the video stream checks for a new frame.
const STREAM_POLL: Duration = Duration::from_millis(40);

/// Shared server state
pub struct ServerState {
    status: SharedStatus,
    sensors: SensorState,
    live_frame: LiveFrame,
    stats: SharedRunStats,
    log_path: PathBuf,
    /// Set once shutdown starts so open video streams end
    closing: AtomicBool,
}

impl ServerState {
    pub fn new(
        status: SharedStatus,
        sensors: SensorState,
        live_frame: LiveFrame,
        stats: SharedRunStats,
        log_path: PathBuf,
    ) -> Self {
        Self {
            status,
            sensors,
            live_frame,
            stats,
            log_path,
            closing: AtomicBool::new(false),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub instance_id: String,
    pub camera_id: String,
}

/// Camera status response
#[derive(Debug, Serialize, Deserialize)]
pub struct CameraStatus {
    /// "active" or "inactive"
    pub status: String,
    pub has_frame: bool,
    pub frames_processed: u64,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Acknowledgement for a pushed PIR reading
#[derive(Debug, Serialize, Deserialize)]
pub struct PirUpdate {
    pub status: String,
    /// Stored value, 0 or 1
    pub pir: u8,
}

/// Acknowledgement for a pushed RFID tag
#[derive(Debug, Serialize, Deserialize)]
pub struct RfidUpdate {
    pub status: String,
    pub rfid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    /// Return at most this many lines
    pub limit: Option<usize>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn log_error(e: std::io::Error) -> ApiError {
    tracing::error!("Failed to read event log: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("Failed to read event log: {}", e),
            code: "LOG_READ_ERROR".to_string(),
        }),
    )
}

fn sensor_error(e: SensorError) -> ApiError {
    tracing::debug!("Rejected pushed sensor reading: {}", e);
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: e.to_string(),
            code: "INVALID_SENSOR_VALUE".to_string(),
        }),
    )
}

/// GET /health
async fn health(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    let snapshot = state.status.current();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: snapshot.instance_id.to_string(),
        camera_id: snapshot.camera_id,
    })
}

/// GET /status
async fn status(State(state): State<Arc<ServerState>>) -> Json<StatusSnapshot> {
    Json(state.status.current())
}

/// GET /sensor_status
async fn sensor_status(State(state): State<Arc<ServerState>>) -> Json<SensorReadings> {
    Json(state.sensors.current())
}

/// POST /update_pir
///
/// Body `{"pir": 0|1}`.
async fn update_pir(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<PirUpdate>, ApiError> {
    let pir = parse_pir(body.get("pir")).map_err(sensor_error)?;
    state.sensors.set_pir(pir);
    Ok(Json(PirUpdate {
        status: "ok".to_string(),
        pir: u8::from(pir),
    }))
}

/// POST /update_rfid
///
/// Body `{"rfid": "<tag>"}`. A blank or missing tag clears the reading.
async fn update_rfid(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<RfidUpdate>, ApiError> {
    let rfid = parse_rfid(body.get("rfid")).map_err(sensor_error)?;
    state.sensors.set_rfid(rfid.clone());
    Ok(Json(RfidUpdate {
        status: "ok".to_string(),
        rfid,
    }))
}

/// GET /camera_status
async fn camera_status(State(state): State<Arc<ServerState>>) -> Json<CameraStatus> {
    let snapshot = state.status.current();
    let active = snapshot
        .updated_at
        .map(|at| (Utc::now() - at).num_seconds() <= CAMERA_STALE_SECS)
        .unwrap_or(false);

    Json(CameraStatus {
        status: if active { "active" } else { "inactive" }.to_string(),
        has_frame: state.live_frame.latest().is_some() || snapshot.updated_at.is_some(),
        frames_processed: state.stats.snapshot().frames_processed,
    })
}

/// GET /logs
///
/// Event log lines, newest first.
async fn logs(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let mut lines = read_lines(&state.log_path).map_err(log_error)?;
    lines.reverse();
    if let Some(limit) = query.limit {
        lines.truncate(limit);
    }
    Ok(Json(lines))
}

/// GET /get_logs
///
/// Event log lines in file order, oldest first. `/logs` serves the same
/// lines newest first.
async fn get_logs(State(state): State<Arc<ServerState>>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(read_lines(&state.log_path).map_err(log_error)?))
}

/// GET /motion_stats
///
/// Event counts per `HH:MM` minute.
async fn motion_stats(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<Vec<MinuteCount>>, ApiError> {
    let lines = read_lines(&state.log_path).map_err(log_error)?;
    Ok(Json(minute_stats(&lines)))
}

/// GET /video_feed
///
/// Multipart JPEG stream of the annotated live frame. Each part is sent once
/// per new frame.
async fn video_feed(State(state): State<Arc<ServerState>>) -> Response {
    let stream = futures_util::stream::unfold((state, None::<u64>), |(state, last)| async move {
        loop {
            if state.closing.load(Ordering::SeqCst) {
                return None;
            }
            if let Some(frame) = state.live_frame.latest() {
                if Some(frame.sequence) != last {
                    let mut part = Vec::with_capacity(frame.jpeg.len() + 64);
                    part.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
                    part.extend_from_slice(&frame.jpeg);
                    part.extend_from_slice(b"\r\n");
                    let sequence = frame.sequence;
                    return Some((
                        Ok::<_, std::io::Error>(Bytes::from(part)),
                        (state, Some(sequence)),
                    ));
                }
            }
            tokio::time::sleep(STREAM_POLL).await;
        }
    });

    (
        [(
            header::CONTENT_TYPE,
            "multipart/x-mixed-replace; boundary=frame",
        )],
        Body::from_stream(stream),
    )
        .into_response()
}

/// Build the router over the given state.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/sensor_status", get(sensor_status))
        .route("/update_pir", post(update_pir))
        .route("/update_rfid", post(update_rfid))
        .route("/camera_status", get(camera_status))
        .route("/logs", get(logs))
        .route("/get_logs", get(get_logs))
        .route("/motion_stats", get(motion_stats))
        .route("/video_feed", get(video_feed))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: &ServerConfig,
    state: ServerState,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(state);
    let app = router(state.clone());

    let addr = SocketAddr::new(config.host, config.port);
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Dashboard server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
                state.closing.store(true, Ordering::SeqCst);
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}

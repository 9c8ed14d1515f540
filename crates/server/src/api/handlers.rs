use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bankrot_core::{PollState, SanitizedConfig};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::metrics::encode_metrics;
use crate::state::AppState;

/// Service name reported by liveness and status.
pub const SERVICE_NAME: &str = "BankrotWatch";

pub async fn liveness() -> &'static str {
    "BankrotWatch is running"
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub service: &'static str,
    /// The process is up and serving.
    pub running: bool,
    /// A poll loop is configured and has not stopped.
    pub polling: bool,
    pub state: PollState,
    pub tracked_entities: usize,
    pub seen_lots: usize,
    pub cycles: u64,
    pub lots_dispatched: u64,
    pub lot_failures: u64,
    pub source_failures: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let poll = state.poll_status();

    Json(StatusResponse {
        status: "running",
        service: SERVICE_NAME,
        running: true,
        polling: state.polling() && poll.running,
        state: poll.state,
        tracked_entities: poll.tracked_entities,
        seen_lots: poll.seen_lots,
        cycles: poll.cycles,
        lots_dispatched: poll.lots_dispatched,
        lot_failures: poll.lot_failures,
        source_failures: poll.source_failures,
        last_cycle_at: poll.last_cycle_at,
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn metrics() -> impl IntoResponse {
    match encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

use axum::{extract::State, Json};
use serde::Serialize;

use crate::net::ConnectionTracker;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct ConnectionSummary {
    pub active: u64,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_connections(State(tracker): State<ConnectionTracker>) -> Json<ConnectionSummary> {
    Json(ConnectionSummary {
        active: tracker.active_count(),
    })
}

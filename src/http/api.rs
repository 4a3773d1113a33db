//! Built-in router behind the Plain-HTTP chain.

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

pub fn default_router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

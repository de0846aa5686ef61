//! Liveness probe for Cloud Run.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Reports which collection triggers broadcasts and where users are read from.
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "busalert-api",
        "version": env!("CARGO_PKG_VERSION"),
        "issues_collection": state.config.issues_collection,
        "user_store": state.config.user_store,
    }))
}

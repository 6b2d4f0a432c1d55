//! Liveness handler.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::server::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// False when the model runs in legacy (unnamed feature) mode.
    pub schema: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        schema: state.sentry.bundle().schema().is_some(),
    })
}

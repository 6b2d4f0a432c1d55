//! Model schema handler.

use axum::{Json, extract::State};
use iotsentry::BundleSummary;

use crate::server::state::AppState;

/// Describe the features and classes of the loaded model.
pub async fn get_schema(State(state): State<AppState>) -> Json<BundleSummary> {
    Json(state.sentry.bundle().summary())
}

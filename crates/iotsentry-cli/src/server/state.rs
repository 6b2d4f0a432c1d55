//! Application state for the web server.

use std::sync::Arc;

use iotsentry::Sentry;

/// Shared application state.
///
/// The loaded model is read-only, so handlers share it without locking.
#[derive(Clone)]
pub struct AppState {
    pub sentry: Arc<Sentry>,
}

impl AppState {
    pub fn new(sentry: Arc<Sentry>) -> Self {
        Self { sentry }
    }
}

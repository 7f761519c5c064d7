//! Route for following the event bus.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use tracing::instrument;

use crate::state::AppState;

/// GET /
///
/// Drains and returns every event published since the last call. Polling
/// clients get each event exactly once.
#[instrument(skip(state))]
async fn drain_events(State(state): State<AppState>) -> Json<Vec<serde_json::Value>> {
    Json(state.feed.drain())
}

/// Returns the router for the event feed.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(drain_events))
}

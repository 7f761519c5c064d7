//! Routes for player settings.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use storyweave_state::store::Settings;
use tracing::instrument;

use crate::state::AppState;

/// GET /
#[instrument(skip(state))]
async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    let session = state.session.lock().await;
    Json(session.settings().clone())
}

/// PUT /
#[instrument(skip(state))]
async fn put_settings(
    State(state): State<AppState>,
    Json(settings): Json<Settings>,
) -> Json<Settings> {
    let mut session = state.session.lock().await;
    session.set_settings(settings);
    Json(session.settings().clone())
}

/// Returns the router for settings.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).put(put_settings))
}

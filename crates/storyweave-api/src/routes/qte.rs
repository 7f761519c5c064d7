//! Routes for the QTE engine.
//!
//! QTEs are started by the battle engine, never directly over HTTP; these
//! routes carry the player's input and expose the marker for drawing.

use axum::extract::State;
use axum::{Json, Router, routing::get, routing::post};
use serde::Serialize;
use storyweave_core::types::QteKind;
use storyweave_qte::QtePhase;
use tracing::instrument;

use crate::state::AppState;

/// Snapshot of the QTE engine.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QteView {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<QteKind>,
    /// Marker position in bar units, absent before launch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_position: Option<f64>,
    /// Target position the zones are centered on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
}

/// Response body for the input and cancel routes.
#[derive(Debug, Serialize)]
pub struct QteActionResponse {
    /// Whether the action landed on a session that could take it.
    pub accepted: bool,
}

/// GET /
#[instrument(skip(state))]
async fn qte_state(State(state): State<AppState>) -> Json<QteView> {
    let session = state.session.lock().await;
    let qte = session.qte();
    let active = qte.is_active();
    Json(QteView {
        active,
        kind: active.then(|| qte.kind()),
        marker_position: qte.marker_position(state.clock.now()),
        target: (qte.phase() != QtePhase::Idle).then(|| qte.target()),
    })
}

/// POST /input
#[instrument(skip(state))]
async fn qte_input(State(state): State<AppState>) -> Json<QteActionResponse> {
    let mut session = state.session.lock().await;
    let accepted = session.qte_input(state.clock.now());
    Json(QteActionResponse { accepted })
}

/// POST /cancel
#[instrument(skip(state))]
async fn qte_cancel(State(state): State<AppState>) -> Json<QteActionResponse> {
    let mut session = state.session.lock().await;
    let accepted = session.qte_cancel();
    Json(QteActionResponse { accepted })
}

/// Returns the router for the QTE engine.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(qte_state))
        .route("/input", post(qte_input))
        .route("/cancel", post(qte_cancel))
}

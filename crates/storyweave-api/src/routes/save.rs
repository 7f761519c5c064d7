//! Routes for save slots and progress resets.
//!
//! Slot 0 is the autosave slot; manual saves go to any slot. All slots
//! share [`storyweave_save::SLOT_COUNT`] with the background autosaver.

use axum::extract::{Path, State};
use axum::{Json, Router, routing::delete, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use storyweave_save::SlotMetadata;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for the save, clear, and reset routes.
#[derive(Debug, Serialize)]
pub struct SaveActionResponse {
    pub ok: bool,
}

/// Response body for the load route.
#[derive(Debug, Serialize)]
pub struct LoadResponse {
    /// False when the slot was empty; the session is left untouched.
    pub loaded: bool,
}

/// Request body for wiping progress.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    #[serde(default)]
    pub keep_settings: bool,
    #[serde(default)]
    pub keep_key_flags: bool,
}

/// GET /slots
#[instrument(skip(state))]
async fn list_slots(State(state): State<AppState>) -> Result<Json<Vec<SlotMetadata>>, ApiError> {
    let slots = state.saves.list_slots().await?;
    Ok(Json(slots))
}

/// POST /slots/{slot}/save
#[instrument(skip(state))]
async fn save_slot(
    State(state): State<AppState>,
    Path(slot): Path<usize>,
) -> Result<Json<SaveActionResponse>, ApiError> {
    let mut session = state.session.lock().await;
    let (store, bus) = session.store_and_bus();
    state.saves.save(slot, store, state.clock.as_ref(), bus).await?;
    info!(slot, "manual save");
    Ok(Json(SaveActionResponse { ok: true }))
}

/// POST /slots/{slot}/load
#[instrument(skip(state))]
async fn load_slot(
    State(state): State<AppState>,
    Path(slot): Path<usize>,
) -> Result<Json<LoadResponse>, ApiError> {
    let mut session = state.session.lock().await;
    let (store, bus) = session.store_and_bus_mut();
    let loaded = state.saves.load(slot, store, bus).await?;
    if loaded {
        session.rehydrate_flags();
        session.resume(state.clock.now())?;
        info!(slot, "save loaded");
    }
    Ok(Json(LoadResponse { loaded }))
}

/// DELETE /slots/{slot}
#[instrument(skip(state))]
async fn clear_slot(
    State(state): State<AppState>,
    Path(slot): Path<usize>,
) -> Result<Json<SaveActionResponse>, ApiError> {
    state.saves.clear(slot).await?;
    Ok(Json(SaveActionResponse { ok: true }))
}

/// POST /reset
#[instrument(skip(state))]
async fn reset_progress(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<SaveActionResponse>, ApiError> {
    let mut session = state.session.lock().await;
    let (store, bus) = session.store_and_bus_mut();
    state
        .saves
        .reset_progress(store, request.keep_settings, request.keep_key_flags, bus)
        .await?;
    session.rehydrate_flags();
    info!(
        keep_settings = request.keep_settings,
        keep_key_flags = request.keep_key_flags,
        "progress reset"
    );
    Ok(Json(SaveActionResponse { ok: true }))
}

/// Returns the router for persistence.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/slots", get(list_slots))
        .route("/slots/{slot}/save", post(save_slot))
        .route("/slots/{slot}/load", post(load_slot))
        .route("/slots/{slot}", delete(clear_slot))
        .route("/reset", post(reset_progress))
}

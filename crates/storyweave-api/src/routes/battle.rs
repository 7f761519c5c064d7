//! Routes for the battle engine.

use axum::extract::State;
use axum::{Json, Router, routing::get, routing::post};
use serde::Serialize;
use storyweave_battle::{BattleConfig, BattlePhase};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Snapshot of the battle engine.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleView {
    pub active: bool,
    pub phase: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enemy_name: Option<String>,
    pub player_hp: i32,
    pub player_max_hp: i32,
    pub enemy_hp: i32,
    pub enemy_max_hp: i32,
}

/// Response body for starting an encounter.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBattleResponse {
    pub session_id: Uuid,
}

/// Response body for the cancel route.
#[derive(Debug, Serialize)]
pub struct CancelBattleResponse {
    pub cancelled: bool,
}

fn phase_name(phase: BattlePhase) -> &'static str {
    match phase {
        BattlePhase::Idle => "idle",
        BattlePhase::PlayerTurn => "playerTurn",
        BattlePhase::AwaitingAttackQte => "awaitingAttackQte",
        BattlePhase::AwaitingDefendQte => "awaitingDefendQte",
        BattlePhase::Waiting => "waiting",
        BattlePhase::Ending => "ending",
    }
}

/// GET /
#[instrument(skip(state))]
async fn battle_state(State(state): State<AppState>) -> Json<BattleView> {
    let session = state.session.lock().await;
    Json(view_of(&session))
}

/// POST /start
#[instrument(skip(state, config), fields(enemy = %config.enemy.name))]
async fn start_battle(
    State(state): State<AppState>,
    Json(config): Json<BattleConfig>,
) -> Result<Json<StartBattleResponse>, ApiError> {
    let mut session = state.session.lock().await;
    let session_id = session.battle_start(config)?;
    info!(%session_id, "battle started");
    Ok(Json(StartBattleResponse { session_id }))
}

/// POST /attack
#[instrument(skip(state))]
async fn attack(State(state): State<AppState>) -> Result<Json<BattleView>, ApiError> {
    let mut session = state.session.lock().await;
    session.battle_attack(state.clock.now())?;
    Ok(Json(view_of(&session)))
}

/// POST /defend
#[instrument(skip(state))]
async fn defend(State(state): State<AppState>) -> Result<Json<BattleView>, ApiError> {
    let mut session = state.session.lock().await;
    session.battle_defend(state.clock.now())?;
    Ok(Json(view_of(&session)))
}

/// POST /cancel
#[instrument(skip(state))]
async fn cancel_battle(State(state): State<AppState>) -> Json<CancelBattleResponse> {
    let mut session = state.session.lock().await;
    let cancelled = session.battle_cancel();
    Json(CancelBattleResponse { cancelled })
}

fn view_of(session: &crate::session::GameSession) -> BattleView {
    let battle = session.battle();
    let active = battle.is_active();
    BattleView {
        active,
        phase: phase_name(battle.phase()),
        enemy_name: active.then(|| battle.enemy_name().to_owned()),
        player_hp: battle.player_hp(),
        player_max_hp: battle.player_max_hp(),
        enemy_hp: battle.enemy_hp(),
        enemy_max_hp: battle.enemy_max_hp(),
    }
}

/// Returns the router for the battle engine.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(battle_state))
        .route("/start", post(start_battle))
        .route("/attack", post(attack))
        .route("/defend", post(defend))
        .route("/cancel", post(cancel_battle))
}

//! Routes for the quiz engine.
//!
//! The state view never carries the correct answer index for the live
//! question; it only surfaces the remembered index for questions the
//! player has already answered in an earlier run.

use axum::extract::State;
use axum::{Json, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use storyweave_quiz::{CountdownUrgency, QuizConfig};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Snapshot of the quiz engine.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub answers: Vec<String>,
    pub question_index: usize,
    pub remaining_secs: u32,
    pub urgency: CountdownUrgency,
    /// Correct index remembered from a previous run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seen_correct_index: Option<usize>,
}

/// Response body for starting a run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizResponse {
    pub session_id: Uuid,
}

/// Request body for answering the posed question.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub index: usize,
}

/// Response body for the cancel route.
#[derive(Debug, Serialize)]
pub struct CancelQuizResponse {
    pub cancelled: bool,
}

fn view_of(session: &crate::session::GameSession) -> QuizView {
    let quiz = session.quiz();
    let active = quiz.is_active();
    let question = quiz.current_question();
    QuizView {
        active,
        prompt: question.map(|q| q.prompt.clone()),
        answers: question.map(|q| q.answers.clone()).unwrap_or_default(),
        question_index: quiz.question_index(),
        remaining_secs: quiz.remaining_secs(),
        urgency: quiz.urgency(),
        seen_correct_index: active
            .then(|| session.ledger().get(quiz.quiz_id(), quiz.question_index()))
            .flatten(),
    }
}

/// GET /
#[instrument(skip(state))]
async fn quiz_state(State(state): State<AppState>) -> Json<QuizView> {
    let session = state.session.lock().await;
    Json(view_of(&session))
}

/// POST /start
#[instrument(skip(state, config), fields(quiz_id = %config.quiz_id))]
async fn start_quiz(
    State(state): State<AppState>,
    Json(config): Json<QuizConfig>,
) -> Result<Json<StartQuizResponse>, ApiError> {
    let mut session = state.session.lock().await;
    let session_id = session.quiz_start(config, state.clock.now())?;
    info!(%session_id, "quiz started");
    Ok(Json(StartQuizResponse { session_id }))
}

/// POST /answer
#[instrument(skip(state))]
async fn answer(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<QuizView>, ApiError> {
    let mut session = state.session.lock().await;
    session.quiz_answer(request.index, state.clock.now())?;
    Ok(Json(view_of(&session)))
}

/// POST /cancel
#[instrument(skip(state))]
async fn cancel_quiz(State(state): State<AppState>) -> Json<CancelQuizResponse> {
    let mut session = state.session.lock().await;
    let cancelled = session.quiz_cancel();
    Json(CancelQuizResponse { cancelled })
}

/// Returns the router for the quiz engine.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(quiz_state))
        .route("/start", post(start_quiz))
        .route("/answer", post(answer))
        .route("/cancel", post(cancel_quiz))
}

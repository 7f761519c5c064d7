//! Routes for the scene and dialogue engine.

use axum::extract::State;
use axum::{Json, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use storyweave_core::types::SceneId;
use storyweave_scene::{ChoiceView, ScenePhase};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::session::GameSession;
use crate::state::AppState;

/// Request body for POST /load.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSceneRequest {
    /// The scene to load.
    pub scene_id: SceneId,
}

/// Request body for POST /choice.
#[derive(Debug, Deserialize)]
pub struct SelectChoiceRequest {
    /// Index into the offered choices.
    pub index: usize,
}

/// Snapshot of the scene engine returned by every scene route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneView {
    pub scene_id: Option<SceneId>,
    pub phase: ScenePhase,
    pub block_index: usize,
    pub visible_text: String,
    pub is_typing: bool,
    pub choices: Vec<ChoiceView>,
}

fn view_of(session: &GameSession) -> SceneView {
    SceneView {
        scene_id: session.scene().current_scene_id().cloned(),
        phase: session.scene().phase(),
        block_index: session.store().scene().current_block_index,
        visible_text: session.scene().visible_text(),
        is_typing: session.scene().is_typing(),
        choices: session.choices(),
    }
}

/// GET /
#[instrument(skip(state))]
async fn current_scene(State(state): State<AppState>) -> Json<SceneView> {
    let session = state.session.lock().await;
    Json(view_of(&session))
}

/// POST /load
#[instrument(skip(state, request), fields(scene_id = %request.scene_id))]
async fn load_scene(
    State(state): State<AppState>,
    Json(request): Json<LoadSceneRequest>,
) -> Result<Json<SceneView>, ApiError> {
    let mut session = state.session.lock().await;
    session.load_scene(&request.scene_id, state.clock.now())?;
    info!("scene loaded");
    Ok(Json(view_of(&session)))
}

/// POST /advance
#[instrument(skip(state))]
async fn advance(State(state): State<AppState>) -> Json<SceneView> {
    let mut session = state.session.lock().await;
    session.advance(state.clock.now());
    Json(view_of(&session))
}

/// POST /choice
#[instrument(skip(state, request), fields(index = request.index))]
async fn select_choice(
    State(state): State<AppState>,
    Json(request): Json<SelectChoiceRequest>,
) -> Result<Json<SceneView>, ApiError> {
    let mut session = state.session.lock().await;
    session.select_choice(request.index, state.clock.now())?;
    info!("choice selected");
    Ok(Json(view_of(&session)))
}

/// Returns the router for the scene engine.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(current_scene))
        .route("/load", post(load_scene))
        .route("/advance", post(advance))
        .route("/choice", post(select_choice))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use chrono::Utc;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use storyweave_core::tuning::Tuning;
    use storyweave_save::{MemoryMedium, SaveManager};
    use storyweave_state::store::TextSpeed;
    use storyweave_story::{Choice, Scene, StoryTable};
    use storyweave_test_support::FixedClock;
    use tower::ServiceExt;

    fn story() -> StoryTable {
        let mut intro = Scene::new("intro");
        intro.text_blocks = vec!["<p>Hello.</p>".to_owned()];
        intro.choices = vec![Choice {
            label: "Onward".to_owned(),
            target: Some(SceneId::from("next")),
            require_flags: Vec::new(),
            set_flags: Vec::new(),
        }];
        let mut next = Scene::new("next");
        next.text_blocks = vec!["<p>Next.</p>".to_owned()];
        StoryTable::from_scenes([intro, next])
    }

    fn test_app() -> axum::Router {
        let mut session = GameSession::new(
            story(),
            Tuning::default(),
            Box::new(storyweave_core::rng::SystemRandom),
        );
        let mut settings = session.settings().clone();
        settings.text_speed = TextSpeed::Instant;
        session.set_settings(settings);

        let state = AppState::new(
            session,
            SaveManager::new(Box::new(MemoryMedium::new())),
            Arc::new(FixedClock(Utc::now())),
        );
        crate::app(state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_load_scene_returns_the_scene_view() {
        let app = test_app();

        let response = app
            .oneshot(post_json("/api/v1/scene/load", json!({"sceneId": "intro"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["sceneId"], "intro");
        assert_eq!(body["phase"], "text");
        assert_eq!(body["visibleText"], "<p>Hello.</p>");
        assert_eq!(body["isTyping"], false);
    }

    #[tokio::test]
    async fn test_unknown_scene_is_404() {
        let app = test_app();

        let response = app
            .oneshot(post_json("/api/v1/scene/load", json!({"sceneId": "nowhere"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "scene_not_found");
    }

    #[tokio::test]
    async fn test_advance_reaches_choices_and_choice_loads_the_target() {
        let app = test_app();
        app.clone()
            .oneshot(post_json("/api/v1/scene/load", json!({"sceneId": "intro"})))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(post_json("/api/v1/scene/advance", json!({})))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["phase"], "choices");
        assert_eq!(body["choices"][0]["label"], "Onward");

        let response = app
            .oneshot(post_json("/api/v1/scene/choice", json!({"index": 0})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["sceneId"], "next");
    }

    #[tokio::test]
    async fn test_choice_out_of_range_is_400() {
        let app = test_app();
        app.clone()
            .oneshot(post_json("/api/v1/scene/load", json!({"sceneId": "intro"})))
            .await
            .unwrap();
        app.clone()
            .oneshot(post_json("/api/v1/scene/advance", json!({})))
            .await
            .unwrap();

        let response = app
            .oneshot(post_json("/api/v1/scene/choice", json!({"index": 7})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_choice");
    }
}

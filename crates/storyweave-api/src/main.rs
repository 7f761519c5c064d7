//! Storyweave API server entry point.

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use storyweave_core::clock::{Clock, SystemClock};
use storyweave_core::rng::SystemRandom;
use storyweave_core::tuning::Tuning;
use storyweave_core::types::SceneId;
use storyweave_save::{FileMedium, SaveManager};
use storyweave_story::markdown::load_story_dir;
use tracing_subscriber::EnvFilter;

use storyweave_api::session::{self, GameSession};
use storyweave_api::state::AppState;

const TICK_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Storyweave API server");

    // Read configuration from environment.
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .map_err(|e| format!("PORT must be a valid u16: {e}"))?;
    let story_dir = PathBuf::from(std::env::var("STORY_DIR").unwrap_or_else(|_| "story".to_string()));
    let save_dir = PathBuf::from(std::env::var("SAVE_DIR").unwrap_or_else(|_| "saves".to_string()));

    // Load tuning, falling back to defaults when no file is given.
    let tuning = match std::env::var("TUNING_FILE") {
        Ok(path) => Tuning::from_yaml(&std::fs::read_to_string(&path)?)?,
        Err(_) => Tuning::default(),
    };

    // Load and validate the story.
    let story = load_story_dir(&story_dir)?;
    tracing::info!(scenes = story.len(), "story loaded");
    for issue in story.validate() {
        tracing::warn!(?issue, "story validation issue");
    }

    // Build application state.
    tokio::fs::create_dir_all(&save_dir).await?;
    let saves = SaveManager::new(Box::new(FileMedium::new(save_dir)));
    let mut game = GameSession::new(story, tuning, Box::new(SystemRandom));
    game.set_ledger(saves.load_ledger().await?);

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(SystemClock);
    let app_state = AppState::new(game, saves, clock.clone());

    // Load the opening scene when one is configured.
    if let Ok(start) = std::env::var("START_SCENE") {
        let mut session = app_state.session.lock().await;
        session.load_scene(&SceneId::new(start), clock.now())?;
    }

    // Background pump: advances timers and runs autosaves between requests.
    let pump_state = app_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            interval.tick().await;
            session::tick_once(&pump_state).await;
        }
    });

    let app = storyweave_api::app(app_state);

    // Start server.
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| format!("invalid HOST:PORT combination: {e}"))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}

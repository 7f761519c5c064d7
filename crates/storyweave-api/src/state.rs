//! Shared application state.

use std::sync::Arc;

use storyweave_core::clock::Clock;
use storyweave_save::SaveManager;
use tokio::sync::Mutex;

use crate::session::{EventFeed, GameSession};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The single playthrough this process hosts.
    pub session: Arc<Mutex<GameSession>>,
    /// Durable storage for slots and the answer ledger.
    pub saves: Arc<SaveManager>,
    /// Wall clock; swapped for a fixed one in tests.
    pub clock: Arc<dyn Clock + Send + Sync>,
    /// Drainable view of the event bus.
    pub feed: EventFeed,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        session: GameSession,
        saves: SaveManager,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let feed = session.feed();
        Self {
            session: Arc::new(Mutex::new(session)),
            saves: Arc::new(saves),
            clock,
            feed,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

//! HTTP surface over the Storyweave engine.
//!
//! One process hosts one playthrough: the [`session::GameSession`] owns the
//! engines behind a lock, request handlers drive it, and a background pump
//! advances its timers between requests.

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod routes;
pub mod session;
pub mod state;

/// Builds the full application router.
#[must_use]
pub fn app(app_state: state::AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/scene", routes::scene::router())
        .nest("/api/v1/qte", routes::qte::router())
        .nest("/api/v1/battle", routes::battle::router())
        .nest("/api/v1/quiz", routes::quiz::router())
        .nest("/api/v1/saves", routes::save::router())
        .nest("/api/v1/settings", routes::settings::router())
        .nest("/api/v1/events", routes::events::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

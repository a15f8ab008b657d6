use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, feed, health};
use crate::server::state::AppState;

/// Main application router.
///
/// CORS is permissive: callers are identified only by their opaque session
/// key, and the upstream proxy owns real access control.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/chat/ask", post(chat::ask))
        .route(
            "/chat/history",
            get(chat::get_history).delete(chat::clear_history),
        )
        .route("/feed/add-feed", post(feed::add_feed))
        .route("/feed/article", post(feed::add_article))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

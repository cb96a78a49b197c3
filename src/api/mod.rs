pub mod chat;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// HTTP surface: the chat page and the question endpoint.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(chat::home))
        .route("/get", get(chat::ask).post(chat::ask))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

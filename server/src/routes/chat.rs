use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::handlers::chat_handlers::{ask, clear, messages, quick_questions, reset, scrape, status, validate};
use crate::middleware::session_middleware::session_middleware;
use crate::state::AppState;

pub fn chat_routes(state: AppState) -> Router {
    Router::new()
        .route("/validate", post(validate))
        .route("/scrape", post(scrape))
        .route("/ask", post(ask))
        .route("/clear", post(clear))
        .route("/reset", post(reset))
        .route("/status", get(status))
        .route("/messages", get(messages))
        .layer(from_fn_with_state(state.clone(), session_middleware))
        // Static list; asking for it must not start a session.
        .route("/quick-questions", get(quick_questions))
        .with_state(state)
}

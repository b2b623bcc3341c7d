pub mod chat;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use chat::chat_routes;

pub fn app(state: AppState, client_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(client_origin)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::COOKIE])
        .allow_credentials(true);

    Router::new()
        .nest("/api", chat_routes(state))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

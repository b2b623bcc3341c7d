use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use tower_cookies::{Cookie, Cookies};
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "site_chat_session";

/// Attach the caller's session to the request, starting a new one when the
/// cookie is missing or points at a session this process does not know.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    let cookies = match req.extensions().get::<Cookies>() {
        Some(c) => c.clone(),
        None => return (StatusCode::INTERNAL_SERVER_ERROR, "Cookie manager missing").into_response(),
    };

    let existing = cookies
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
        .and_then(|id| state.get(&id));

    let handle = match existing {
        Some(handle) => handle,
        None => {
            let handle = state.create();
            debug!(session = %handle.id, "started new session");
            cookies.add(
                Cookie::build((SESSION_COOKIE, handle.id.to_string()))
                    .path("/")
                    .http_only(true)
                    .build(),
            );
            handle
        }
    };

    req.extensions_mut().insert(handle);
    next.run(req).await.into_response()
}

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use site_chat::error::{AskError, CompletionError, FetchError, ScrapeError, ValidationError};
use site_chat::session::QUICK_QUESTIONS;
use tower_cookies::{Cookie, Cookies};

use crate::middleware::session_middleware::SESSION_COOKIE;
use crate::state::{AppState, SessionHandle};

#[derive(Deserialize)]
pub struct ValidatePayload {
    pub api_key: String,
}

#[derive(Deserialize)]
pub struct ScrapePayload {
    pub url: String,
}

#[derive(Deserialize)]
pub struct AskPayload {
    pub question: String,
}

type Reply = (StatusCode, Json<Value>);

fn success(message: String) -> Reply {
    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": message })),
    )
}

fn failure(status: StatusCode, message: impl ToString) -> Reply {
    (
        status,
        Json(json!({ "success": false, "message": message.to_string() })),
    )
}

fn validation_status(err: &ValidationError) -> StatusCode {
    match err {
        ValidationError::EmptyKey => StatusCode::BAD_REQUEST,
        ValidationError::InvalidKey => StatusCode::UNAUTHORIZED,
        ValidationError::Other(_) => StatusCode::BAD_GATEWAY,
    }
}

fn scrape_status(err: &ScrapeError) -> StatusCode {
    match err {
        ScrapeError::NotValidated => StatusCode::CONFLICT,
        ScrapeError::EmptyUrl | ScrapeError::Fetch(FetchError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
        ScrapeError::Fetch(FetchError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
        ScrapeError::Fetch(_) => StatusCode::BAD_GATEWAY,
        ScrapeError::Extract(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn ask_status(err: &AskError) -> StatusCode {
    match err {
        AskError::EmptyQuestion(_) => StatusCode::BAD_REQUEST,
        AskError::NotValidated | AskError::NoDocument => StatusCode::CONFLICT,
        AskError::Completion(CompletionError::AuthenticationError) => StatusCode::UNAUTHORIZED,
        AskError::Completion(CompletionError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
        AskError::Completion(CompletionError::Other(_)) => StatusCode::BAD_GATEWAY,
    }
}

/// POST /api/validate
pub async fn validate(
    Extension(handle): Extension<SessionHandle>,
    Json(payload): Json<ValidatePayload>,
) -> impl IntoResponse {
    let mut session = handle.session.lock().await;
    match session.validate(&payload.api_key).await {
        Ok(message) => success(message),
        Err(e) => failure(validation_status(&e), e),
    }
}

/// POST /api/scrape
pub async fn scrape(
    Extension(handle): Extension<SessionHandle>,
    Json(payload): Json<ScrapePayload>,
) -> impl IntoResponse {
    let mut session = handle.session.lock().await;
    match session.scrape(&payload.url).await {
        Ok(message) => {
            let url = session.document().map(|d| d.source_url.clone());
            (
                StatusCode::OK,
                Json(json!({ "success": true, "message": message, "website_url": url })),
            )
        }
        Err(e) => failure(scrape_status(&e), e),
    }
}

/// POST /api/ask
pub async fn ask(
    Extension(handle): Extension<SessionHandle>,
    Json(payload): Json<AskPayload>,
) -> impl IntoResponse {
    let mut session = handle.session.lock().await;
    match session.ask(&payload.question).await {
        Ok(answer) => success(answer),
        Err(e) => failure(ask_status(&e), e),
    }
}

/// POST /api/clear
pub async fn clear(Extension(handle): Extension<SessionHandle>) -> impl IntoResponse {
    success(handle.session.lock().await.clear_chat())
}

/// POST /api/reset
///
/// Ends the session outright: the next request starts a fresh one.
pub async fn reset(
    State(state): State<AppState>,
    cookies: Cookies,
    Extension(handle): Extension<SessionHandle>,
) -> impl IntoResponse {
    let message = handle.session.lock().await.reset_all();
    state.remove(&handle.id);
    cookies.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    success(message)
}

/// GET /api/status
pub async fn status(Extension(handle): Extension<SessionHandle>) -> impl IntoResponse {
    let status = handle.session.lock().await.status();
    (
        StatusCode::OK,
        Json(json!({ "success": true, "session_id": handle.id, "status": status })),
    )
}

/// GET /api/messages
pub async fn messages(Extension(handle): Extension<SessionHandle>) -> impl IntoResponse {
    let session = handle.session.lock().await;
    (
        StatusCode::OK,
        Json(json!({ "success": true, "messages": session.history() })),
    )
}

/// GET /api/quick-questions
pub async fn quick_questions() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "success": true, "questions": QUICK_QUESTIONS })),
    )
}

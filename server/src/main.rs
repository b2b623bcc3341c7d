mod handlers;
mod middleware;
mod routes;
mod state;

use std::{env, sync::Arc, time::Duration};

use axum::http::HeaderValue;
use site_chat::{ai::HttpTransport, config::Settings, fetcher::Fetcher};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use state::{AppState, DEFAULT_SESSION_IDLE};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_CLIENT_URL: &str = "http://localhost:5173";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // API keys arrive per session; GROQ_API_KEY only matters to the CLI.
    let settings = Settings::from_env()?;
    let idle_timeout = match env::var("SESSION_IDLE_SECS") {
        Ok(secs) => Duration::from_secs(secs.trim().parse()?),
        Err(_) => DEFAULT_SESSION_IDLE,
    };
    let client_url = env::var("CLIENT_URL").unwrap_or_else(|_| DEFAULT_CLIENT_URL.to_string());
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

    let transport = Arc::new(HttpTransport::new(&settings.api_url, settings.completion_timeout)?);
    let pages = Arc::new(Fetcher::new()?);
    let state = AppState::new(transport, pages).with_idle_timeout(idle_timeout);
    let app = routes::app(state, client_url.parse::<HeaderValue>()?);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("listening on {} (CORS origin {})", bind_addr, client_url);
    axum::serve(listener, app).await?;
    Ok(())
}

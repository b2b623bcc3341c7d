//! Single-page HTTP fetching.

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::FetchError;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Markers of bot-protection interstitials served instead of the real page.
const BOT_WALL_MARKERS: [&str; 2] = ["Attention Required!", "Checking your browser"];

/// How far into the body a `<meta>` charset declaration is looked for.
const META_SNIFF_BYTES: usize = 1024;

/// Undecoded response body of a fetched page, its declared content type and
/// the URL it finally resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContent {
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawContent {
    /// Content already known to be UTF-8 HTML.
    pub fn from_html(final_url: impl Into<String>, html: &str) -> Self {
        Self {
            final_url: final_url.into(),
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: html.as_bytes().to_vec(),
        }
    }

    /// Encoding named by the `Content-Type` header, else by a `<meta>`
    /// declaration near the top of the document, else UTF-8.
    pub fn encoding(&self) -> &'static Encoding {
        self.content_type
            .as_deref()
            .and_then(charset_label)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .or_else(|| meta_charset(&self.body))
            .unwrap_or(UTF_8)
    }

    /// Body decoded to text. A byte-order mark overrides the declared
    /// encoding.
    pub fn text(&self) -> String {
        let encoding = self.encoding();
        let (text, used, had_errors) = encoding.decode(&self.body);
        if had_errors {
            debug!("{} body had bytes invalid in {}", self.final_url, used.name());
        }
        text.into_owned()
    }
}

/// Value of a `charset=` parameter, unquoted.
fn charset_label(declaration: &str) -> Option<&str> {
    let start = declaration.to_ascii_lowercase().find("charset=")? + "charset=".len();
    let rest = declaration[start..].trim_start_matches(['"', '\'']);
    let end = rest
        .find(|c: char| matches!(c, '"' | '\'' | ';' | ',' | '>' | '/') || c.is_whitespace())
        .unwrap_or(rest.len());
    let label = &rest[..end];
    (!label.is_empty()).then_some(label)
}

fn meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&body[..body.len().min(META_SNIFF_BYTES)]);
    let lower = head.to_ascii_lowercase();
    lower.match_indices("<meta").find_map(|(at, _)| {
        let tag = &head[at..];
        let tag = &tag[..tag.find('>').unwrap_or(tag.len())];
        charset_label(tag).and_then(|label| Encoding::for_label(label.as_bytes()))
    })
}

/// Anything that can turn a URL into page content.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RawContent, FetchError>;
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| FetchError::Other(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for Fetcher {
    async fn fetch(&self, url: &str) -> Result<RawContent, FetchError> {
        let url = normalize_url(url)?;
        debug!("Fetching page: {}", url);

        let res = self.client.get(url.clone()).send().await.map_err(classify)?;

        let status = res.status();
        if !status.is_success() {
            warn!("{} HTTP error: {}", url, status);
            return Err(FetchError::HttpStatusError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let final_url = res.url().to_string();
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = res.bytes().await.map_err(classify)?.to_vec();

        let preview = String::from_utf8_lossy(&body);
        if BOT_WALL_MARKERS.iter().any(|marker| preview.contains(marker)) {
            warn!("{} returned a bot protection page", final_url);
        }

        info!("Fetched {} bytes from: {}", body.len(), final_url);
        Ok(RawContent {
            final_url,
            content_type,
            body,
        })
    }
}

/// Prefix `https://` onto URLs given without an http(s) scheme and check the
/// result parses.
pub fn normalize_url(url: &str) -> Result<Url, FetchError> {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    };
    Url::parse(&candidate).map_err(|e| FetchError::InvalidUrl(format!("{:?}: {}", url, e)))
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_connect() {
        FetchError::ConnectionFailure
    } else {
        FetchError::Other(err.to_string())
    }
}

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{CompletionError, ValidationError};
use crate::Message;

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const MODEL: &str = "llama-3.3-70b-versatile";
pub const MAX_OUTPUT_TOKENS: u32 = 800;
pub const TEMPERATURE: f32 = 0.7;

const PROBE_PROMPT: &str = "test";
const PROBE_MAX_TOKENS: u32 = 5;

/// Provider API key. Kept out of `Debug` output and logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: &str) -> Self {
        Self(key.trim().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Request used for answering questions.
    pub fn answer(messages: Vec<Message>) -> Self {
        Self {
            model: MODEL.to_string(),
            messages,
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: Some(TEMPERATURE),
        }
    }

    /// Smallest possible request, used to check a key.
    pub fn probe() -> Self {
        Self {
            model: MODEL.to_string(),
            messages: vec![Message::user(PROBE_PROMPT)],
            max_tokens: PROBE_MAX_TOKENS,
            temperature: None,
        }
    }
}

/// The outbound chat-completion call.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, api_key: &ApiKey, request: &CompletionRequest) -> Result<String, CompletionError>;
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Deserialize)]
struct ProviderError {
    message: String,
}

/// OpenAI-compatible `/chat/completions` over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// No timeout unless one is given; the provider's own limit applies.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, CompletionError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CompletionError::Other(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, api_key: &ApiKey, request: &CompletionRequest) -> Result<String, CompletionError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key.expose()))
                .map_err(|_| CompletionError::AuthenticationError)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        debug!(
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "sending completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| CompletionError::Other(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CompletionError::Other(e.to_string()))?;

        if !status.is_success() {
            let err = classify_failure(status, &body);
            warn!("completion request failed with {}: {}", status, err);
            return Err(err);
        }

        parse_answer(&body)
    }
}

/// Map a non-success provider reply onto the completion error kinds.
pub fn classify_failure(status: StatusCode, body: &str) -> CompletionError {
    let message = serde_json::from_str::<ProviderErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    let lower = message.to_lowercase();

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || lower.contains("authentication")
    {
        CompletionError::AuthenticationError
    } else if status == StatusCode::TOO_MANY_REQUESTS || lower.contains("rate limit") {
        CompletionError::RateLimited
    } else if message.is_empty() {
        CompletionError::Other(format!("provider returned {}", status))
    } else {
        CompletionError::Other(format!("provider returned {}: {}", status, message))
    }
}

fn parse_answer(body: &str) -> Result<String, CompletionError> {
    let response: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::Other(format!("unreadable completion response: {}", e)))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| CompletionError::Other("completion response had no answer".to_string()))
}

/// A transport bound to one validated key.
#[derive(Clone)]
pub struct CompletionClient {
    transport: Arc<dyn ChatTransport>,
    api_key: ApiKey,
}

impl CompletionClient {
    pub fn new(transport: Arc<dyn ChatTransport>, api_key: ApiKey) -> Self {
        Self { transport, api_key }
    }

    pub async fn complete(&self, messages: Vec<Message>) -> Result<String, CompletionError> {
        let request = CompletionRequest::answer(messages);
        let answer = self.transport.send(&self.api_key, &request).await?;
        info!("received {} character answer", answer.chars().count());
        Ok(answer)
    }
}

/// Check a key with one trial call. Blank keys never reach the network.
pub async fn validate_key(transport: &dyn ChatTransport, api_key: &str) -> Result<ApiKey, ValidationError> {
    if api_key.trim().is_empty() {
        return Err(ValidationError::EmptyKey);
    }

    let key = ApiKey::new(api_key);
    match transport.send(&key, &CompletionRequest::probe()).await {
        Ok(_) => {
            info!("API key validated");
            Ok(key)
        }
        Err(CompletionError::AuthenticationError) => Err(ValidationError::InvalidKey),
        Err(e) => Err(ValidationError::Other(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedTransport {
        reply: Result<String, CompletionError>,
        calls: AtomicUsize,
        last: Mutex<Option<(ApiKey, CompletionRequest)>>,
    }

    impl ScriptedTransport {
        fn new(reply: Result<String, CompletionError>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(&self, api_key: &ApiKey, request: &CompletionRequest) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some((api_key.clone(), request.clone()));
            self.reply.clone()
        }
    }

    #[tokio::test]
    async fn test_empty_key_never_calls_transport() {
        let transport = ScriptedTransport::new(Ok("ok".to_string()));

        assert_eq!(validate_key(&transport, "").await, Err(ValidationError::EmptyKey));
        assert_eq!(validate_key(&transport, "   ").await, Err(ValidationError::EmptyKey));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_key_is_trimmed_and_probed() {
        let transport = ScriptedTransport::new(Ok("ok".to_string()));

        let key = validate_key(&transport, "  gsk_abc \n").await.unwrap();
        assert_eq!(key.expose(), "gsk_abc");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        let (sent_key, request) = transport.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent_key.expose(), "gsk_abc");
        assert_eq!(request.max_tokens, 5);
        assert_eq!(request.messages, vec![Message::user("test")]);
    }

    #[tokio::test]
    async fn test_validation_failure_kinds() {
        let transport = ScriptedTransport::new(Err(CompletionError::AuthenticationError));
        assert_eq!(validate_key(&transport, "bad").await, Err(ValidationError::InvalidKey));

        let transport = ScriptedTransport::new(Err(CompletionError::RateLimited));
        assert_eq!(
            validate_key(&transport, "key").await,
            Err(ValidationError::Other(
                "Rate limit exceeded. Please wait and try again.".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_complete_uses_fixed_budget() {
        let transport = Arc::new(ScriptedTransport::new(Ok("An answer".to_string())));
        let client = CompletionClient::new(transport.clone(), ApiKey::new("gsk_abc"));

        let answer = client.complete(vec![Message::user("hi")]).await.unwrap();
        assert_eq!(answer, "An answer");

        let (_, request) = transport.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.model, MODEL);
        assert_eq!(request.max_tokens, 800);
        assert_eq!(request.temperature, Some(0.7));
    }

    #[test]
    fn test_request_wire_format() {
        let value = serde_json::to_value(CompletionRequest::answer(vec![Message::system("s")])).unwrap();
        assert_eq!(value["model"], "llama-3.3-70b-versatile");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["max_tokens"], 800);
        assert!(value["temperature"].is_number());

        let value = serde_json::to_value(CompletionRequest::probe()).unwrap();
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            classify_failure(StatusCode::UNAUTHORIZED, r#"{"error":{"message":"Invalid API Key"}}"#),
            CompletionError::AuthenticationError
        );
        assert_eq!(
            classify_failure(StatusCode::BAD_REQUEST, "authentication failed"),
            CompletionError::AuthenticationError
        );
        assert_eq!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, ""),
            CompletionError::RateLimited
        );
        assert_eq!(
            classify_failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error":{"message":"model overloaded"}}"#
            ),
            CompletionError::Other("provider returned 500 Internal Server Error: model overloaded".to_string())
        );
        assert_eq!(
            classify_failure(StatusCode::BAD_GATEWAY, ""),
            CompletionError::Other("provider returned 502 Bad Gateway".to_string())
        );
    }

    #[test]
    fn test_parse_answer() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Widgets.  "}}]}"#;
        assert_eq!(parse_answer(body), Ok("Widgets.".to_string()));

        assert!(matches!(parse_answer(r#"{"choices":[]}"#), Err(CompletionError::Other(_))));
        assert!(matches!(parse_answer("not json"), Err(CompletionError::Other(_))));
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("gsk_secret");
        assert!(!format!("{:?}", key).contains("secret"));
    }
}

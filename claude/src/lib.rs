//! Minimal Anthropic Claude API client.
//!
//! Text-only access to the Messages API: a system prompt, a list of
//! user/assistant turns, and the concatenated text of the reply. The
//! story engine treats generation as "submit prompt, receive text", so
//! nothing beyond that surface lives here.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Errors that can occur when using the Claude client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured (set ANTHROPIC_API_KEY)")]
    NoApiKey,

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Timeout | Error::Network(_) => true,
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A usable key, or `NoApiKey` when unset or blank.
fn api_key(value: Option<String>) -> Result<String, Error> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(Error::NoApiKey),
    }
}

/// Claude API client.
#[derive(Clone)]
pub struct Claude {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl Claude {
    /// Create a new Claude client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, Error> {
        Self::with_timeout(api_key, Duration::from_secs(120))
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Create a Claude client from the ANTHROPIC_API_KEY environment variable.
    pub fn from_env(timeout: Duration) -> Result<Self, Error> {
        let api_key = api_key(std::env::var("ANTHROPIC_API_KEY").ok())?;
        Self::with_timeout(api_key, timeout)
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The model used when a request does not name one.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a completion request and return the full response.
    pub async fn complete(&self, request: Request) -> Result<Response, Error> {
        let api_request = self.build_api_request(&request);
        let headers = self.build_headers()?;

        let response = self
            .client
            .post(format!("{API_BASE}/messages"))
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout
                } else {
                    Error::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(api_response.into())
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    fn build_api_request(&self, request: &Request) -> ApiRequest {
        ApiRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            max_tokens: request.max_tokens,
            system: request.system.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.as_str(),
                    content: m.text.clone(),
                })
                .collect(),
            temperature: request.temperature,
        }
    }
}

// ============================================================================
// Public types
// ============================================================================

/// A completion request to send to Claude.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub max_tokens: usize,
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
}

impl Request {
    /// Create a new request with the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            model: None,
            max_tokens: 2048,
            system: None,
            messages,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A text message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A completion response from Claude.
#[derive(Debug, Clone)]
pub struct Response {
    pub id: String,
    pub model: String,
    /// Text blocks in the order they were returned.
    pub blocks: Vec<String>,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

impl Response {
    /// Get all text content concatenated.
    pub fn text(&self) -> String {
        self.blocks.concat()
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    Other,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    id: String,
    model: String,
    content: Vec<ApiContent>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContent {
    Text {
        text: String,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Default, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: usize,
    #[serde(default)]
    output_tokens: usize,
}

impl From<ApiResponse> for Response {
    fn from(api: ApiResponse) -> Self {
        let blocks = api
            .content
            .into_iter()
            .filter_map(|c| match c {
                ApiContent::Text { text } => Some(text),
                ApiContent::Unsupported => None,
            })
            .collect();

        let stop_reason = match api.stop_reason.as_deref() {
            Some("end_turn") => StopReason::EndTurn,
            Some("max_tokens") => StopReason::MaxTokens,
            Some("stop_sequence") => StopReason::StopSequence,
            _ => StopReason::Other,
        };

        Response {
            id: api.id,
            model: api.model,
            blocks,
            stop_reason,
            usage: Usage {
                input_tokens: api.usage.input_tokens,
                output_tokens: api.usage.output_tokens,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = Request::new(vec![Message::user("Hello")])
            .with_system("You narrate.")
            .with_max_tokens(500)
            .with_temperature(0.7);

        assert_eq!(request.max_tokens, 500);
        assert_eq!(request.system.as_deref(), Some("You narrate."));
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.messages[0].role, Role::User);
    }

    #[test]
    fn test_api_request_uses_client_model_by_default() {
        let client = Claude::new("test-key").unwrap().with_model("claude-test");
        let request = Request::new(vec![Message::user("Hi"), Message::assistant("Hello")]);

        let api = client.build_api_request(&request);
        let json = serde_json::to_value(&api).unwrap();

        assert_eq!(json["model"], "claude-test");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert!(json.get("system").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_api_request_model_override() {
        let client = Claude::new("test-key").unwrap();
        let request = Request::new(vec![Message::user("Hi")]).with_model("other-model");

        let api = client.build_api_request(&request);
        assert_eq!(api.model, "other-model");
    }

    #[test]
    fn test_parse_response_skips_non_text_blocks() {
        let raw = r#"{
            "id": "msg_1",
            "model": "claude-test",
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "The wind howls. "},
                {"type": "text", "text": "Dust everywhere."}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 8}
        }"#;

        let api: ApiResponse = serde_json::from_str(raw).unwrap();
        let response: Response = api.into();

        assert_eq!(response.text(), "The wind howls. Dust everywhere.");
        assert_eq!(response.stop_reason, StopReason::EndTurn);
        assert_eq!(response.usage.output_tokens, 8);
    }

    #[test]
    fn test_api_key_must_be_set() {
        assert_eq!(api_key(Some("sk-test".into())).unwrap(), "sk-test");
        assert!(matches!(api_key(Some("  ".into())), Err(Error::NoApiKey)));
        assert!(matches!(api_key(None), Err(Error::NoApiKey)));
    }

    #[test]
    fn test_error_transience() {
        assert!(Error::Timeout.is_transient());
        assert!(Error::Api {
            status: 529,
            message: String::new()
        }
        .is_transient());
        assert!(!Error::Api {
            status: 400,
            message: String::new()
        }
        .is_transient());
        assert!(!Error::NoApiKey.is_transient());
    }
}

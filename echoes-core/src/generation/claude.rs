//! Generation backed by the Claude Messages API.

use super::{GenerationError, GenerationRequest, Generator};
use crate::config::EngineConfig;
use ::claude::{Claude, Message, Request};
use async_trait::async_trait;

/// Sends each request as one user turn under the system prompt.
#[derive(Clone)]
pub struct ClaudeGenerator {
    client: Claude,
    max_tokens: usize,
    temperature: Option<f32>,
}

impl ClaudeGenerator {
    pub fn new(client: Claude) -> Self {
        Self {
            client,
            max_tokens: 2048,
            temperature: None,
        }
    }

    /// A client from `ANTHROPIC_API_KEY`, tuned by `config`.
    pub fn from_env(config: &EngineConfig) -> Result<Self, GenerationError> {
        let client = Claude::from_env(config.generation_timeout()).map_err(map_error)?;
        Ok(Self::from_config(client, config))
    }

    pub fn from_config(client: Claude, config: &EngineConfig) -> Self {
        let client = match &config.model {
            Some(model) => client.with_model(model.clone()),
            None => client,
        };
        Self {
            client,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }
}

fn map_error(err: ::claude::Error) -> GenerationError {
    match err {
        ::claude::Error::NoApiKey | ::claude::Error::Config(_) => {
            GenerationError::Unavailable(err.to_string())
        }
        other => GenerationError::Service {
            transient: other.is_transient(),
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl Generator for ClaudeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let mut api_request = Request::new(vec![Message::user(request.prompt.clone())])
            .with_max_tokens(self.max_tokens)
            .with_system(request.system.clone());
        if let Some(temperature) = self.temperature {
            api_request = api_request.with_temperature(temperature);
        }

        let response = self.client.complete(api_request).await.map_err(map_error)?;
        tracing::debug!(
            model = %response.model,
            stop_reason = ?response.stop_reason,
            "narrator replied"
        );
        Ok(response.text())
    }
}

//! The text-generation capability: submit a prompt, receive text.

mod claude;
mod parse;

pub use self::claude::ClaudeGenerator;
pub use parse::{parse_reply, FoundItem, ParseError, RoundOutcome};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from one generation attempt.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("reply could not be used: {0}")]
    Unparseable(#[from] ParseError),

    #[error("generation service error: {message}")]
    Service { message: String, transient: bool },

    #[error("generation service unavailable: {0}")]
    Unavailable(String),
}

impl GenerationError {
    /// Whether the same request is worth sending again.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Timeout(_) | GenerationError::Unparseable(_) => true,
            GenerationError::Service { transient, .. } => *transient,
            GenerationError::Unavailable(_) => false,
        }
    }
}

/// A rendered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
        }
    }
}

/// Anything that turns a prompt into free text.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Box<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        (**self).generate(request).await
    }
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for std::sync::Arc<G> {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        (**self).generate(request).await
    }
}

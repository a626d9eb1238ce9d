//! Engine configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, an
//! optional TOML file, then `ECHOES_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::memory::{DEFAULT_JOURNAL_SUMMARY_CHARS, DEFAULT_NPC_SUMMARY_CHARS};

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{var} has an invalid value: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Replacement prompt templates; unset fields use the built-in text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateOverrides {
    pub system: Option<String>,
    pub story: Option<String>,
    pub epilogue: Option<String>,
}

/// Tunables for the story engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Journal entries included verbatim in each prompt.
    pub recent_window: usize,

    /// Character budget shared by the NPC list and the recent events.
    pub context_budget: usize,

    /// Bound on each NPC's relationship summary.
    pub npc_summary_chars: usize,

    /// Bound on the journal's rolling summary.
    pub journal_summary_chars: usize,

    /// Seconds before a generation attempt is abandoned.
    pub generation_timeout_secs: u64,

    /// Generation attempts per round before the round is aborted.
    pub attempts_per_round: u32,

    /// Store writes per commit before the commit is left pending.
    pub persist_attempts: u32,

    /// Model override for the Claude generator.
    pub model: Option<String>,

    /// Maximum tokens for each reply.
    pub max_tokens: usize,

    /// Temperature for generation.
    pub temperature: Option<f32>,

    pub templates: TemplateOverrides,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recent_window: 5,
            context_budget: 6000,
            npc_summary_chars: DEFAULT_NPC_SUMMARY_CHARS,
            journal_summary_chars: DEFAULT_JOURNAL_SUMMARY_CHARS,
            generation_timeout_secs: 90,
            attempts_per_round: 2,
            persist_attempts: 2,
            model: None,
            max_tokens: 2048,
            temperature: Some(0.8),
            templates: TemplateOverrides::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)?.with_env_overrides()
    }

    /// Apply `ECHOES_*` variables from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides from any variable lookup.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(model) = lookup("ECHOES_MODEL").filter(|m| !m.trim().is_empty()) {
            self.model = Some(model.trim().to_string());
        }
        if let Some(value) = lookup("ECHOES_RECENT_WINDOW") {
            self.recent_window = parse_env("ECHOES_RECENT_WINDOW", &value)?;
        }
        if let Some(value) = lookup("ECHOES_CONTEXT_BUDGET") {
            self.context_budget = parse_env("ECHOES_CONTEXT_BUDGET", &value)?;
        }
        if let Some(value) = lookup("ECHOES_TIMEOUT_SECS") {
            self.generation_timeout_secs = parse_env("ECHOES_TIMEOUT_SECS", &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.attempts_per_round == 0 {
            return Err(ConfigError::Invalid(
                "attempts_per_round must be at least 1".to_string(),
            ));
        }
        if self.persist_attempts == 0 {
            return Err(ConfigError::Invalid(
                "persist_attempts must be at least 1".to_string(),
            ));
        }
        if self.generation_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "generation_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn with_recent_window(mut self, n: usize) -> Self {
        self.recent_window = n;
        self
    }

    pub fn with_context_budget(mut self, chars: usize) -> Self {
        self.context_budget = chars;
        self
    }

    pub fn with_npc_summary_chars(mut self, chars: usize) -> Self {
        self.npc_summary_chars = chars;
        self
    }

    pub fn with_journal_summary_chars(mut self, chars: usize) -> Self {
        self.journal_summary_chars = chars;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_attempts_per_round(mut self, attempts: u32) -> Self {
        self.attempts_per_round = attempts.max(1);
        self
    }

    pub fn with_persist_attempts(mut self, attempts: u32) -> Self {
        self.persist_attempts = attempts.max(1);
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set max tokens for responses.
    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }

    /// Set temperature for generation.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_story_template(mut self, template: impl Into<String>) -> Self {
        self.templates.story = Some(template.into());
        self
    }

    pub fn with_system_template(mut self, template: impl Into<String>) -> Self {
        self.templates.system = Some(template.into());
        self
    }

    pub fn with_epilogue_template(mut self, template: impl Into<String>) -> Self {
        self.templates.epilogue = Some(template.into());
        self
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

//! Configuration for the synthesis pipeline
//!
//! Every section has defaults, so a TOML file only needs the keys it
//! changes.

use crate::speech::tts::TtsConfig;
use crate::speech::voices::VoiceCatalog;
use crate::{Result, VoiceLabError};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// How sentences are submitted to the synthesizer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One sentence at a time, in order
    #[default]
    Sequential,
    /// All sentences in flight at once, re-ordered on completion
    Concurrent,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "concurrent" => Ok(ExecutionMode::Concurrent),
            other => Err(format!("unknown execution mode: {}", other)),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "sequential"),
            ExecutionMode::Concurrent => write!(f, "concurrent"),
        }
    }
}

/// Bounded retry for synthesis calls
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per sentence (1 = no retry)
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_backoff_ms: u64,

    /// Upper bound for the doubling delay
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 100,
            max_backoff_ms: 2000,
        }
    }
}

impl RetryPolicy {
    /// Single attempt per sentence
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.initial_backoff_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_backoff_ms))
    }
}

/// Orchestration settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub mode: ExecutionMode,

    /// Cap on outstanding calls in concurrent mode (None = unbounded)
    pub max_in_flight: Option<usize>,

    pub retry: RetryPolicy,
}

impl SynthesisConfig {
    pub fn sequential() -> Self {
        Self::default()
    }

    pub fn concurrent() -> Self {
        Self {
            mode: ExecutionMode::Concurrent,
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = Some(max_in_flight);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(VoiceLabError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.max_in_flight == Some(0) {
            return Err(VoiceLabError::Config("max_in_flight must be at least 1".into()));
        }
        Ok(())
    }
}

/// Voice selection
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Voice used when none is given
    pub default: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            default: VoiceCatalog::builtin().default_voice().id.clone(),
        }
    }
}

/// Top-level configuration
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct VoiceLabConfig {
    pub synthesis: SynthesisConfig,
    pub voice: VoiceConfig,
    pub tts: TtsConfig,
}

impl VoiceLabConfig {
    /// Load and validate a TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            VoiceLabError::Io(format!("Failed to read {:?}: {}", path.as_ref(), e))
        })?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without validating it
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| VoiceLabError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        self.synthesis.validate()?;
        VoiceCatalog::builtin().require(&self.voice.default)?;
        Ok(())
    }
}

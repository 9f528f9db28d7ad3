//! Integration layer tying text, speech and audio together
//!
//! This module provides:
//! - Pipeline configuration (TOML-loadable)
//! - The synthesis orchestrator

pub mod config;
pub mod orchestrator;

pub use config::{ExecutionMode, RetryPolicy, SynthesisConfig, VoiceConfig, VoiceLabConfig};
pub use orchestrator::{OrchestratorBuilder, SynthesisOrchestrator};

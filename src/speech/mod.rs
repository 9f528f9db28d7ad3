//! Speech synthesis collaborators
//!
//! This module provides:
//! - The synthesizer trait the orchestrator drives
//! - A worker thread serving blocking engines
//! - A sherpa-rs backed synthesizer (feature `sherpa`)
//! - The voice catalog

pub mod tts;
pub mod voices;

// Re-export commonly used types
#[cfg(feature = "sherpa")]
pub use tts::SherpaSynthesizer;
pub use tts::{EngineWorker, SpeechEngine, SpeechSynthesizer, SynthesizedAudio, TtsConfig};
pub use voices::{Gender, Voice, VoiceCatalog};

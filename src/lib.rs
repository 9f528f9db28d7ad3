pub mod audio;
pub mod integration;
pub mod speech;
pub mod text;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoiceLabError {
    #[error("No speakable content in input text")]
    NoContent,

    #[error("Synthesis failed for sentence {index} ({sentence:?}): {reason}")]
    SynthesisFailure {
        index: usize,
        sentence: String,
        reason: String,
    },

    #[error("Sample rate mismatch at chunk {index}: expected {expected} Hz, got {actual} Hz")]
    SampleRateMismatch {
        index: usize,
        expected: u32,
        actual: u32,
    },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for VoiceLabError {
    fn from(e: std::io::Error) -> Self {
        VoiceLabError::Io(e.to_string())
    }
}

impl VoiceLabError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // The user has to change the input first
            VoiceLabError::NoContent => false,
            // External service hiccups are usually transient
            VoiceLabError::SynthesisFailure { .. } => true,
            // The model reports a fixed rate; retrying yields the same mismatch
            VoiceLabError::SampleRateMismatch { .. } => false,
            VoiceLabError::Encoding(_) => false,
            VoiceLabError::UnknownVoice(_) => false,
            VoiceLabError::AudioDevice(_) => false,
            VoiceLabError::ModelLoad(_) => false,
            VoiceLabError::Config(_) => false,
            VoiceLabError::Io(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            VoiceLabError::NoContent => "Please enter some text to convert to speech.".to_string(),
            VoiceLabError::SynthesisFailure { .. } => {
                "Failed to generate speech. Please try again.".to_string()
            }
            VoiceLabError::SampleRateMismatch { .. } => {
                "The speech model returned inconsistent audio.".to_string()
            }
            VoiceLabError::Encoding(_) => "Failed to encode the generated audio.".to_string(),
            VoiceLabError::UnknownVoice(voice) => format!("Voice '{}' is not available.", voice),
            VoiceLabError::AudioDevice(_) => {
                "Audio device error. Please check your speakers.".to_string()
            }
            VoiceLabError::ModelLoad(_) => {
                "Failed to load TTS model. Please try again later.".to_string()
            }
            VoiceLabError::Config(_) => "Configuration error. Please check settings.".to_string(),
            VoiceLabError::Io(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VoiceLabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_failure_is_recoverable() {
        let err = VoiceLabError::SynthesisFailure {
            index: 2,
            sentence: "How are you?".to_string(),
            reason: "timeout".to_string(),
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("sentence 2"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_user_messages() {
        assert!(!VoiceLabError::NoContent.is_recoverable());
        assert!(VoiceLabError::NoContent.user_message().contains("enter some text"));
        assert!(VoiceLabError::UnknownVoice("xx".into()).user_message().contains("xx"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: VoiceLabError = io.into();
        assert!(matches!(err, VoiceLabError::Io(_)));
    }
}

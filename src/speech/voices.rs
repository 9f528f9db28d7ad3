//! Voice catalog offered to callers

use crate::{Result, VoiceLabError};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

/// A selectable voice
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    /// Identifier passed to the synthesizer (e.g. `af_bella`)
    pub id: String,

    /// Human-readable name
    pub name: String,

    pub gender: Gender,

    /// Country code shown as a flag; empty when unspecified
    #[serde(default)]
    pub country: String,

    /// Speaker index inside a multi-speaker model
    pub speaker_id: i32,
}

impl Voice {
    pub fn new(id: &str, name: &str, gender: Gender, speaker_id: i32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            gender,
            country: String::new(),
            speaker_id,
        }
    }

    /// Label shown in voice pickers: first name, gender emoji, optional flag
    pub fn display_label(&self) -> String {
        let first_name = self.name.split(' ').next().unwrap_or_default();
        let gender = match self.gender {
            Gender::Female => "👩",
            Gender::Male => "🙎‍♂️",
        };
        let flag = if self.country.is_empty() { "" } else { " 🇺🇸" };
        format!("{} {}{}", first_name, gender, flag)
    }
}

/// Ordered set of voices; the first entry is the default
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
}

impl VoiceCatalog {
    /// Build a catalog from voices; fails when empty or ids repeat
    pub fn new(voices: Vec<Voice>) -> Result<Self> {
        if voices.is_empty() {
            return Err(VoiceLabError::Config("Voice catalog is empty".into()));
        }
        for (i, voice) in voices.iter().enumerate() {
            if voices[..i].iter().any(|v| v.id == voice.id) {
                return Err(VoiceLabError::Config(format!("Duplicate voice id: {}", voice.id)));
            }
        }
        Ok(Self { voices })
    }

    /// The voices shipped with the demo
    ///
    /// Speaker ids follow the speaker order of the sherpa-onnx
    /// `kokoro-multi-lang-v1_0` model (53 speakers).
    pub fn builtin() -> Self {
        Self {
            voices: vec![
                Voice::new("af_bella", "Bella", Gender::Female, 2),
                Voice::new("am_adam", "Adam", Gender::Male, 11),
                Voice::new("bm_lewis", "Lewis", Gender::Male, 27),
                Voice::new("af_nicole", "Nicole", Gender::Female, 6),
                Voice::new("am_onyx", "Onyx", Gender::Male, 17),
                Voice::new("am_michael", "Michael", Gender::Male, 16),
            ],
        }
    }

    /// Speaker count of the model the builtin ids refer to
    pub const BUILTIN_SPEAKERS: i32 = 53;

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn default_voice(&self) -> &Voice {
        &self.voices[0]
    }

    pub fn find(&self, id: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.id == id)
    }

    /// Look up a voice, failing with `UnknownVoice`
    pub fn require(&self, id: &str) -> Result<&Voice> {
        self.find(id)
            .ok_or_else(|| VoiceLabError::UnknownVoice(id.to_string()))
    }

    /// Check every speaker id against a model with `num_speakers` speakers
    pub fn check_speaker_range(&self, num_speakers: i32) -> Result<()> {
        match self
            .voices
            .iter()
            .find(|v| v.speaker_id < 0 || v.speaker_id >= num_speakers)
        {
            Some(voice) => Err(VoiceLabError::Config(format!(
                "Voice {} uses speaker {} but the model has {} speakers",
                voice.id, voice.speaker_id, num_speakers
            ))),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = VoiceCatalog::builtin();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.default_voice().id, "af_bella");
        assert_eq!(catalog.find("bm_lewis").map(|v| v.gender), Some(Gender::Male));
        assert!(catalog.find("zz_nobody").is_none());
    }

    #[test]
    fn test_require_unknown() {
        let catalog = VoiceCatalog::builtin();
        assert_eq!(
            catalog.require("nope"),
            Err(VoiceLabError::UnknownVoice("nope".to_string()))
        );
    }

    #[test]
    fn test_display_label() {
        let mut voice = Voice::new("af_bella", "Bella Rose", Gender::Female, 1);
        assert_eq!(voice.display_label(), "Bella 👩");

        voice.country = "us".to_string();
        assert_eq!(voice.display_label(), "Bella 👩 🇺🇸");

        let adam = Voice::new("am_adam", "Adam", Gender::Male, 5);
        assert_eq!(adam.display_label(), "Adam 🙎‍♂️");
    }

    #[test]
    fn test_builtin_speakers_in_model_range() {
        let catalog = VoiceCatalog::builtin();
        assert!(catalog
            .check_speaker_range(VoiceCatalog::BUILTIN_SPEAKERS)
            .is_ok());
        assert_eq!(catalog.require("am_onyx").unwrap().speaker_id, 17);

        let mut ids: Vec<i32> = catalog.voices().iter().map(|v| v.speaker_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), catalog.len());
    }

    #[test]
    fn test_speaker_range_rejects_out_of_range() {
        // An 11-speaker model has no room for speaker 11 and up
        let result = VoiceCatalog::builtin().check_speaker_range(11);
        assert!(matches!(result, Err(VoiceLabError::Config(msg)) if msg.contains("am_adam")));
    }

    #[test]
    fn test_catalog_validation() {
        assert!(VoiceCatalog::new(Vec::new()).is_err());

        let dup = vec![
            Voice::new("a", "A", Gender::Female, 0),
            Voice::new("a", "B", Gender::Male, 1),
        ];
        assert!(VoiceCatalog::new(dup).is_err());
    }

    #[test]
    fn test_voice_serializes() {
        let json = serde_json::to_string(&VoiceCatalog::builtin().voices()[0]).unwrap();
        assert!(json.contains("\"gender\":\"female\""));
    }
}

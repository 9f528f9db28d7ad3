//! Synthesized audio containers

use crate::audio::assembler::concatenate;
use crate::audio::wav::{encode_wav, WavFile};
use crate::{Result, VoiceLabError};
use uuid::Uuid;

/// Mono audio synthesized for one sentence
#[derive(Clone, Debug, PartialEq)]
pub struct PcmChunk {
    /// Audio samples (f32, mono, nominally in [-1, 1])
    pub samples: Vec<f32>,

    /// Sample rate reported by the synthesizer
    pub sample_rate: u32,

    /// Index of the sentence this chunk was synthesized from
    pub sentence_index: usize,
}

impl PcmChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32, sentence_index: usize) -> Self {
        Self {
            samples,
            sample_rate,
            sentence_index,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the duration of this chunk in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Ordered audio for one full text input
///
/// All chunks share the track's sample rate.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioTrack {
    request_id: Uuid,
    sample_rate: u32,
    chunks: Vec<PcmChunk>,
}

impl AudioTrack {
    /// Build a track from chunks already in sentence order
    ///
    /// The first chunk's rate becomes canonical; any later chunk with a
    /// different rate is rejected.
    pub fn from_chunks(chunks: Vec<PcmChunk>) -> Result<Self> {
        let sample_rate = match chunks.first() {
            Some(first) => first.sample_rate,
            None => return Err(VoiceLabError::NoContent),
        };

        if let Some((index, chunk)) = chunks
            .iter()
            .enumerate()
            .find(|(_, c)| c.sample_rate != sample_rate)
        {
            return Err(VoiceLabError::SampleRateMismatch {
                index,
                expected: sample_rate,
                actual: chunk.sample_rate,
            });
        }

        Ok(Self {
            request_id: Uuid::new_v4(),
            sample_rate,
            chunks,
        })
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn chunks(&self) -> &[PcmChunk] {
        &self.chunks
    }

    pub fn into_chunks(self) -> Vec<PcmChunk> {
        self.chunks
    }

    /// Total number of samples across all chunks
    pub fn total_samples(&self) -> usize {
        self.chunks.iter().map(PcmChunk::len).sum()
    }

    pub fn duration_secs(&self) -> f64 {
        self.total_samples() as f64 / self.sample_rate as f64
    }

    /// Flatten the track into one contiguous buffer
    pub fn concatenate(&self) -> Vec<f32> {
        concatenate(&self.chunks)
    }

    /// Encode the whole track as a mono WAV file
    pub fn to_wav(&self) -> Result<WavFile> {
        encode_wav(&self.concatenate(), self.sample_rate, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_duration() {
        let chunk = PcmChunk::new(vec![0.0; 24000], 24000, 0);
        assert!((chunk.duration_secs() - 1.0).abs() < 1e-9);
        assert_eq!(PcmChunk::new(vec![0.0; 10], 0, 0).duration_secs(), 0.0);
    }

    #[test]
    fn test_track_rate_mismatch() {
        let chunks = vec![
            PcmChunk::new(vec![0.1; 10], 24000, 0),
            PcmChunk::new(vec![0.2; 10], 22050, 1),
        ];
        assert_eq!(
            AudioTrack::from_chunks(chunks),
            Err(VoiceLabError::SampleRateMismatch {
                index: 1,
                expected: 24000,
                actual: 22050,
            })
        );
    }

    #[test]
    fn test_empty_track_is_no_content() {
        assert_eq!(AudioTrack::from_chunks(Vec::new()), Err(VoiceLabError::NoContent));
    }

    #[test]
    fn test_track_totals_and_wav() {
        let track = AudioTrack::from_chunks(vec![
            PcmChunk::new(vec![0.5; 100], 16000, 0),
            PcmChunk::new(vec![-0.5; 60], 16000, 1),
        ])
        .unwrap();

        assert_eq!(track.total_samples(), 160);
        assert_eq!(track.sample_rate(), 16000);
        assert!((track.duration_secs() - 0.01).abs() < 1e-9);

        let wav = track.to_wav().unwrap();
        assert_eq!(wav.len(), 44 + 160 * 2);
    }
}

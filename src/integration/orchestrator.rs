//! Orchestrator for sentence-by-sentence synthesis
//!
//! Connects the components: Text -> Sentences -> TTS -> AudioTrack

use crate::audio::track::{AudioTrack, PcmChunk};
use crate::integration::config::{ExecutionMode, RetryPolicy, SynthesisConfig};
use crate::speech::tts::SpeechSynthesizer;
use crate::speech::voices::VoiceCatalog;
use crate::text::segmenter::SentenceSegmenter;
use crate::{Result, VoiceLabError};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns an ordered list of sentences into one audio track
///
/// Either every sentence is synthesized or the call fails; no partial
/// track is ever returned.
pub struct SynthesisOrchestrator {
    /// Speech backend
    synthesizer: Arc<dyn SpeechSynthesizer>,

    /// Used by `synthesize_text`
    segmenter: SentenceSegmenter,

    /// Execution mode and retry policy
    config: SynthesisConfig,

    /// When present, voice ids are checked before any call
    catalog: Option<VoiceCatalog>,
}

impl SynthesisOrchestrator {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            synthesizer,
            segmenter: SentenceSegmenter::new(),
            config: SynthesisConfig::default(),
            catalog: None,
        }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn catalog(&self) -> Option<&VoiceCatalog> {
        self.catalog.as_ref()
    }

    /// Segment `text` and synthesize every sentence
    pub async fn synthesize_text(&self, text: &str, voice_id: &str) -> Result<AudioTrack> {
        let sentences = self.segmenter.segment(text);
        self.synthesize(&sentences, voice_id).await
    }

    /// Synthesize `sentences` in order and assemble the results
    pub async fn synthesize(&self, sentences: &[String], voice_id: &str) -> Result<AudioTrack> {
        if sentences.is_empty() {
            return Err(VoiceLabError::NoContent);
        }

        if let Some(catalog) = &self.catalog {
            catalog.require(voice_id)?;
        }

        info!(
            "Synthesizing {} sentences with voice {} ({} mode)",
            sentences.len(),
            voice_id,
            self.config.mode
        );

        let track = match self.config.mode {
            ExecutionMode::Sequential => self.run_sequential(sentences, voice_id).await?,
            ExecutionMode::Concurrent => self.run_concurrent(sentences, voice_id).await?,
        };

        info!(
            "Track {} ready: {} samples at {} Hz ({:.2}s)",
            track.request_id(),
            track.total_samples(),
            track.sample_rate(),
            track.duration_secs()
        );

        Ok(track)
    }

    async fn run_sequential(&self, sentences: &[String], voice_id: &str) -> Result<AudioTrack> {
        let mut chunks: Vec<PcmChunk> = Vec::with_capacity(sentences.len());

        for (index, sentence) in sentences.iter().enumerate() {
            let chunk = self.synthesize_sentence(index, sentence, voice_id).await?;

            // Fail before issuing further calls
            if let Some(first) = chunks.first() {
                if chunk.sample_rate != first.sample_rate {
                    return Err(VoiceLabError::SampleRateMismatch {
                        index,
                        expected: first.sample_rate,
                        actual: chunk.sample_rate,
                    });
                }
            }

            chunks.push(chunk);
        }

        AudioTrack::from_chunks(chunks)
    }

    async fn run_concurrent(&self, sentences: &[String], voice_id: &str) -> Result<AudioTrack> {
        let limit = self
            .config
            .max_in_flight
            .unwrap_or(sentences.len())
            .max(1);

        let mut pending = stream::iter(sentences.iter().enumerate())
            .map(|(index, sentence)| self.synthesize_sentence(index, sentence, voice_id))
            .buffer_unordered(limit);

        let mut chunks = Vec::with_capacity(sentences.len());
        while let Some(result) = pending.next().await {
            // Returning drops the stream and every call still in flight
            chunks.push(result?);
        }

        chunks.sort_by_key(|chunk| chunk.sentence_index);
        AudioTrack::from_chunks(chunks)
    }

    async fn synthesize_sentence(
        &self,
        index: usize,
        sentence: &str,
        voice_id: &str,
    ) -> Result<PcmChunk> {
        let retry = &self.config.retry;
        let mut attempt = 1;

        loop {
            match self.synthesizer.synthesize(sentence, voice_id).await {
                Ok(audio) => {
                    debug!(
                        "Sentence {} synthesized: {} samples at {} Hz",
                        index,
                        audio.samples.len(),
                        audio.sample_rate
                    );
                    return Ok(PcmChunk::new(audio.samples, audio.sample_rate, index));
                }
                Err(e) if attempt < retry.max_attempts => {
                    let delay = retry.backoff(attempt);
                    warn!(
                        "Sentence {} failed (attempt {}/{}), retrying in {:?}: {:#}",
                        index, attempt, retry.max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(VoiceLabError::SynthesisFailure {
                        index,
                        sentence: sentence.to_string(),
                        reason: format!("{:#}", e),
                    });
                }
            }
        }
    }
}

/// Builder for creating an orchestrator
pub struct OrchestratorBuilder {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    segmenter: SentenceSegmenter,
    config: SynthesisConfig,
    catalog: Option<VoiceCatalog>,
}

impl OrchestratorBuilder {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            synthesizer,
            segmenter: SentenceSegmenter::new(),
            config: SynthesisConfig::default(),
            catalog: None,
        }
    }

    /// Set the full synthesis configuration
    pub fn with_config(mut self, config: SynthesisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn with_segmenter(mut self, segmenter: SentenceSegmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Reject voice ids missing from `catalog`
    pub fn with_catalog(mut self, catalog: VoiceCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Build the orchestrator
    pub fn build(self) -> Result<SynthesisOrchestrator> {
        self.config.validate()?;
        Ok(SynthesisOrchestrator {
            synthesizer: self.synthesizer,
            segmenter: self.segmenter,
            config: self.config,
            catalog: self.catalog,
        })
    }
}

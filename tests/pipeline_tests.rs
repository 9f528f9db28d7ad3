//! Integration tests for the voicelab pipeline
//!
//! These tests drive text through segmentation, synthesis, assembly, WAV
//! export and scheduling using stub synthesizers and the in-memory sink.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use voicelab::audio::sink::{AudioSink, MemorySink, SinkState};
use voicelab::audio::wav::{decode_wav, WAV_HEADER_LEN};
use voicelab::audio::PlaybackScheduler;
use voicelab::integration::{ExecutionMode, OrchestratorBuilder, SynthesisOrchestrator};
use voicelab::speech::{SpeechSynthesizer, SynthesizedAudio, VoiceCatalog};
use voicelab::text::segment;
use voicelab::VoiceLabError;

/// Deterministic audio per sentence, delivered after a random delay
struct JitterSynth {
    sample_rate: u32,
}

impl JitterSynth {
    fn samples_for(text: &str) -> Vec<f32> {
        text.bytes()
            .map(|b| (b as f32 - 96.0) / 128.0)
            .collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for JitterSynth {
    async fn synthesize(&self, text: &str, _voice_id: &str) -> anyhow::Result<SynthesizedAudio> {
        let jitter = Uuid::new_v4().as_bytes()[0] % 20;
        tokio::time::sleep(Duration::from_millis(jitter as u64)).await;
        Ok(SynthesizedAudio::new(Self::samples_for(text), self.sample_rate))
    }
}

/// Sentence length in samples is encoded in the text itself
struct SizedSynth;

#[async_trait]
impl SpeechSynthesizer for SizedSynth {
    async fn synthesize(&self, text: &str, _voice_id: &str) -> anyhow::Result<SynthesizedAudio> {
        let (len, rate) = text
            .split_once('@')
            .ok_or_else(|| anyhow::anyhow!("bad test sentence: {}", text))?;
        Ok(SynthesizedAudio::new(
            vec![0.5; len.trim().parse()?],
            rate.trim().parse()?,
        ))
    }
}

/// Fails one sentence after a delay
struct BrokenSynth {
    broken: &'static str,
}

#[async_trait]
impl SpeechSynthesizer for BrokenSynth {
    async fn synthesize(&self, text: &str, _voice_id: &str) -> anyhow::Result<SynthesizedAudio> {
        let jitter = Uuid::new_v4().as_bytes()[1] % 10;
        tokio::time::sleep(Duration::from_millis(jitter as u64)).await;
        if text == self.broken {
            anyhow::bail!("upstream returned 503");
        }
        Ok(SynthesizedAudio::new(vec![0.0; 100], 24000))
    }
}

fn orchestrator(synth: Arc<dyn SpeechSynthesizer>, mode: ExecutionMode) -> SynthesisOrchestrator {
    OrchestratorBuilder::new(synth)
        .with_mode(mode)
        .with_catalog(VoiceCatalog::builtin())
        .build()
        .unwrap()
}

fn sentences(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_segmentation_example() {
    assert_eq!(
        segment("Hello world. How are you?"),
        vec!["Hello world.", "How are you?"]
    );
    assert!(segment("").is_empty());
    assert!(segment(" \t\n ").is_empty());
}

#[tokio::test]
async fn test_sequential_and_concurrent_agree() {
    let text = "The quick brown fox jumps. It lands softly! Does anyone notice? \
                Nobody does. The end.";
    let synth: Arc<dyn SpeechSynthesizer> = Arc::new(JitterSynth { sample_rate: 22050 });

    for _ in 0..3 {
        let sequential = orchestrator(synth.clone(), ExecutionMode::Sequential)
            .synthesize_text(text, "af_bella")
            .await
            .unwrap();
        let concurrent = orchestrator(synth.clone(), ExecutionMode::Concurrent)
            .synthesize_text(text, "af_bella")
            .await
            .unwrap();

        assert_eq!(sequential.sample_rate(), concurrent.sample_rate());
        assert_eq!(sequential.chunks(), concurrent.chunks());
        assert_eq!(sequential.concatenate(), concurrent.concatenate());
        assert_ne!(sequential.request_id(), concurrent.request_id());
    }
}

#[tokio::test]
async fn test_text_to_wav() {
    let synth = Arc::new(JitterSynth { sample_rate: 24000 });
    let track = orchestrator(synth, ExecutionMode::Concurrent)
        .synthesize_text("Hello world. How are you?", "am_adam")
        .await
        .unwrap();

    let expected = JitterSynth::samples_for("Hello world.")
        .into_iter()
        .chain(JitterSynth::samples_for("How are you?"))
        .collect::<Vec<f32>>();
    assert_eq!(track.concatenate(), expected);

    let wav = track.to_wav().unwrap();
    assert_eq!(wav.len(), WAV_HEADER_LEN + expected.len() * 2);

    let decoded = decode_wav(wav.as_bytes()).unwrap();
    assert_eq!(decoded.sample_rate, 24000);
    assert_eq!(decoded.channels, 1);
    assert_eq!(decoded.samples.len(), expected.len());
    for (original, restored) in expected.iter().zip(&decoded.samples) {
        assert!((original - restored).abs() <= 1.0 / 32767.0 + 1e-6);
    }
}

#[tokio::test]
async fn test_schedule_offsets_from_synthesized_track() {
    let track = orchestrator(Arc::new(SizedSynth), ExecutionMode::Concurrent)
        .synthesize(
            &sentences(&["1000 @ 24000", "2000 @ 24000", "1500 @ 24000"]),
            "af_bella",
        )
        .await
        .unwrap();

    let sink = MemorySink::suspended();
    sink.set_time(2.5);
    let scheduler = PlaybackScheduler::new(Arc::new(sink.clone()));
    let schedule = scheduler.play_track(&track).await.unwrap();

    assert_eq!(sink.state(), SinkState::Running);
    assert_eq!(sink.resume_count(), 1);

    let expected = [0.0, 1000.0 / 24000.0, 3000.0 / 24000.0];
    for (actual, expected) in schedule.relative_start_times().iter().zip(expected) {
        assert!((actual - expected).abs() < 1e-12);
    }
    assert!((schedule.total_duration() - 4500.0 / 24000.0).abs() < 1e-12);
    assert_eq!(sink.units().len(), 3);
}

#[tokio::test]
async fn test_playback_is_gapless() {
    let synth = Arc::new(JitterSynth { sample_rate: 16000 });
    let track = orchestrator(synth, ExecutionMode::Concurrent)
        .synthesize_text("One. Two two. Three three three.", "af_bella")
        .await
        .unwrap();

    let sink = MemorySink::new();
    PlaybackScheduler::new(Arc::new(sink.clone()))
        .play_track(&track)
        .await
        .unwrap();

    assert_eq!(sink.render(16000), track.concatenate());
}

#[tokio::test]
async fn test_rate_mismatch_yields_no_track() {
    for mode in [ExecutionMode::Sequential, ExecutionMode::Concurrent] {
        let result = orchestrator(Arc::new(SizedSynth), mode)
            .synthesize(&sentences(&["10 @ 24000", "10 @ 22050"]), "af_bella")
            .await;

        assert_eq!(
            result,
            Err(VoiceLabError::SampleRateMismatch {
                index: 1,
                expected: 24000,
                actual: 22050,
            })
        );
    }
}

#[tokio::test]
async fn test_failure_aborts_concurrent_batch() {
    let synth = Arc::new(BrokenSynth { broken: "Second." });
    let result = orchestrator(synth, ExecutionMode::Concurrent)
        .synthesize_text("First. Second. Third.", "af_bella")
        .await;

    match result {
        Err(err @ VoiceLabError::SynthesisFailure { .. }) => {
            assert!(err.is_recoverable());
            if let VoiceLabError::SynthesisFailure {
                index,
                sentence,
                reason,
            } = err
            {
                assert_eq!(index, 1);
                assert_eq!(sentence, "Second.");
                assert!(reason.contains("503"));
            }
        }
        other => panic!("expected synthesis failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_text_is_no_content() {
    let synth = Arc::new(JitterSynth { sample_rate: 24000 });
    let result = orchestrator(synth, ExecutionMode::Sequential)
        .synthesize_text("   ", "af_bella")
        .await;
    assert_eq!(result, Err(VoiceLabError::NoContent));
}

#[tokio::test]
async fn test_closed_sink_rejected() {
    let track = orchestrator(Arc::new(SizedSynth), ExecutionMode::Sequential)
        .synthesize(&sentences(&["10 @ 8000"]), "af_bella")
        .await
        .unwrap();

    let sink = MemorySink::new();
    sink.close();
    let result = PlaybackScheduler::new(Arc::new(sink.clone()))
        .play_track(&track)
        .await;

    assert!(matches!(result, Err(VoiceLabError::AudioDevice(_))));
    assert!(sink.units().is_empty());
}

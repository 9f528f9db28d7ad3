//! Text-to-speech synthesizers
//!
//! The orchestrator only sees the [`SpeechSynthesizer`] trait. Blocking
//! engines implement [`SpeechEngine`] and are driven by an [`EngineWorker`]
//! that owns the engine on a dedicated thread. With the `sherpa` feature,
//! [`SherpaSynthesizer`] runs a Kokoro or VITS model through sherpa-rs.

use crate::speech::voices::VoiceCatalog;
use crate::{Result, VoiceLabError};
use async_trait::async_trait;
use crossbeam_channel::bounded;
use serde::Deserialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

/// Audio returned by one synthesis call
#[derive(Clone, Debug, PartialEq)]
pub struct SynthesizedAudio {
    /// Audio samples (f32, mono)
    pub samples: Vec<f32>,

    /// Sample rate of the audio
    pub sample_rate: u32,
}

impl SynthesizedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Get the duration of this audio in seconds
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// External speech synthesis capability
///
/// Errors are opaque to callers; the orchestrator wraps them with the
/// sentence that failed.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice_id: &str) -> anyhow::Result<SynthesizedAudio>;
}

#[async_trait]
impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<T> {
    async fn synthesize(&self, text: &str, voice_id: &str) -> anyhow::Result<SynthesizedAudio> {
        (**self).synthesize(text, voice_id).await
    }
}

/// Blocking synthesis engine addressed by speaker index
///
/// Engines never leave the worker thread that loaded them, so they need
/// not be `Send`.
pub trait SpeechEngine {
    /// Number of speakers the loaded model offers, if known
    fn num_speakers(&self) -> Option<i32> {
        None
    }

    fn synthesize(&mut self, text: &str, speaker_id: i32) -> anyhow::Result<SynthesizedAudio>;
}

/// Configuration for the sherpa-rs TTS engine
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Path to the ONNX model file
    pub model_path: String,

    /// Path to the tokens file
    pub tokens_path: String,

    /// Path to the Kokoro voices file; selects the Kokoro engine when set
    pub voices_path: Option<String>,

    /// Path to the lexicon file (optional for some models)
    pub lexicon_path: Option<String>,

    /// Path to the data directory (optional)
    pub data_dir: Option<String>,

    /// Path to dict directory (optional)
    pub dict_dir: Option<String>,

    /// Speakers in the model; voices outside the range are rejected at load
    pub num_speakers: Option<i32>,

    /// Length scale for speech rate (1.0 = normal, <1.0 = faster, >1.0 = slower)
    pub length_scale: f32,

    /// Noise scale for variation (VITS only)
    pub noise_scale: f32,

    /// Noise scale width (VITS only)
    pub noise_scale_w: f32,

    /// Maximum queue size for pending synthesis requests
    pub queue_size: usize,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            model_path: String::new(),
            tokens_path: String::new(),
            voices_path: None,
            lexicon_path: None,
            data_dir: None,
            dict_dir: None,
            num_speakers: None,
            length_scale: 1.0,
            noise_scale: 0.667,
            noise_scale_w: 0.8,
            queue_size: 100,
        }
    }
}

impl TtsConfig {
    /// Create a new TTS config with required paths
    pub fn new(model_path: impl Into<String>, tokens_path: impl Into<String>) -> Self {
        Self {
            model_path: model_path.into(),
            tokens_path: tokens_path.into(),
            ..Default::default()
        }
    }

    /// Configure a Kokoro model with its voices file
    pub fn with_voices(mut self, voices_path: impl Into<String>) -> Self {
        self.voices_path = Some(voices_path.into());
        self
    }

    pub fn with_lexicon(mut self, lexicon_path: impl Into<String>) -> Self {
        self.lexicon_path = Some(lexicon_path.into());
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<String>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn with_dict_dir(mut self, dict_dir: impl Into<String>) -> Self {
        self.dict_dir = Some(dict_dir.into());
        self
    }

    pub fn with_num_speakers(mut self, num_speakers: i32) -> Self {
        self.num_speakers = Some(num_speakers);
        self
    }

    /// Set the speech rate (length scale)
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.length_scale = 1.0 / speed.max(0.1); // higher speed = lower length_scale
        self
    }
}

struct Request {
    text: String,
    speaker_id: i32,
    reply: oneshot::Sender<anyhow::Result<SynthesizedAudio>>,
}

/// Serves a [`SpeechEngine`] from a dedicated worker thread
///
/// Requests are served one at a time in arrival order. Callers wait
/// asynchronously for queue space, so a full queue never blocks a runtime
/// thread.
pub struct EngineWorker {
    catalog: VoiceCatalog,
    command_tx: Option<mpsc::Sender<Request>>,
    worker: Option<JoinHandle<()>>,
}

impl EngineWorker {
    /// Load an engine on a new worker thread and wait until it is ready
    ///
    /// Fails when loading fails or a catalog voice is outside the engine's
    /// speaker range.
    pub fn spawn<E, F>(load: F, catalog: VoiceCatalog, queue_size: usize) -> Result<Self>
    where
        E: SpeechEngine + 'static,
        F: FnOnce() -> Result<E> + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(queue_size.max(1));
        let (ready_tx, ready_rx) = bounded(1);
        let worker_catalog = catalog.clone();

        let worker = thread::spawn(move || {
            let engine = match load().and_then(|engine| {
                if let Some(count) = engine.num_speakers() {
                    worker_catalog.check_speaker_range(count)?;
                }
                Ok(engine)
            }) {
                Ok(engine) => engine,
                Err(e) => {
                    error!("Failed to initialize TTS engine: {}", e);
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if ready_tx.send(Ok(())).is_ok() {
                run_worker(engine, command_rx);
            }
        });

        ready_rx
            .recv()
            .map_err(|e| VoiceLabError::ModelLoad(format!("TTS worker exited: {}", e)))??;

        Ok(Self {
            catalog,
            command_tx: Some(command_tx),
            worker: Some(worker),
        })
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }
}

#[async_trait]
impl SpeechSynthesizer for EngineWorker {
    async fn synthesize(&self, text: &str, voice_id: &str) -> anyhow::Result<SynthesizedAudio> {
        let speaker_id = self.catalog.require(voice_id)?.speaker_id;
        let command_tx = self
            .command_tx
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("TTS worker is not running"))?;
        let (reply, response) = oneshot::channel();

        command_tx
            .send(Request {
                text: text.to_string(),
                speaker_id,
                reply,
            })
            .await
            .map_err(|_| anyhow::anyhow!("TTS worker is not running"))?;

        response
            .await
            .map_err(|_| anyhow::anyhow!("TTS worker dropped the request"))?
    }
}

impl Drop for EngineWorker {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop
        self.command_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker<E: SpeechEngine>(mut engine: E, mut command_rx: mpsc::Receiver<Request>) {
    info!("TTS worker started");

    while let Some(request) = command_rx.blocking_recv() {
        let result = engine.synthesize(&request.text, request.speaker_id);
        let _ = request.reply.send(result);
    }

    info!("TTS worker stopped");
}

#[cfg(feature = "sherpa")]
pub use engine::SherpaSynthesizer;

#[cfg(feature = "sherpa")]
mod engine {
    use super::{EngineWorker, SpeechEngine, SpeechSynthesizer, SynthesizedAudio, TtsConfig};
    use crate::speech::voices::VoiceCatalog;
    use crate::{Result, VoiceLabError};
    use async_trait::async_trait;
    use sherpa_rs::tts::{KokoroTts, KokoroTtsConfig, VitsTts, VitsTtsConfig};
    use std::path::Path;
    use tracing::{debug, info};

    enum Model {
        Kokoro(KokoroTts),
        Vits(VitsTts),
    }

    /// sherpa-rs model owned by the worker thread
    struct SherpaEngine {
        model: Model,
        num_speakers: Option<i32>,
    }

    fn require_file(kind: &str, path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(VoiceLabError::Config(format!("{} path is required", kind)));
        }
        if !Path::new(path).exists() {
            return Err(VoiceLabError::ModelLoad(format!("{} not found: {}", kind, path)));
        }
        Ok(())
    }

    impl SherpaEngine {
        fn load(config: &TtsConfig) -> Result<Self> {
            require_file("Model", &config.model_path)?;
            require_file("Tokens", &config.tokens_path)?;

            let model = match &config.voices_path {
                Some(voices) => {
                    require_file("Voices", voices)?;
                    info!("Loading Kokoro TTS model from: {}", config.model_path);

                    Model::Kokoro(KokoroTts::new(KokoroTtsConfig {
                        model: config.model_path.clone(),
                        voices: voices.clone(),
                        tokens: config.tokens_path.clone(),
                        data_dir: config.data_dir.clone().unwrap_or_default(),
                        dict_dir: config.dict_dir.clone().unwrap_or_default(),
                        lexicon: config.lexicon_path.clone().unwrap_or_default(),
                        length_scale: config.length_scale,
                        ..Default::default()
                    }))
                }
                None => {
                    info!("Loading VITS TTS model from: {}", config.model_path);

                    Model::Vits(VitsTts::new(VitsTtsConfig {
                        model: config.model_path.clone(),
                        tokens: config.tokens_path.clone(),
                        lexicon: config.lexicon_path.clone().unwrap_or_default(),
                        data_dir: config.data_dir.clone().unwrap_or_default(),
                        dict_dir: config.dict_dir.clone().unwrap_or_default(),
                        length_scale: config.length_scale,
                        noise_scale: config.noise_scale,
                        noise_scale_w: config.noise_scale_w,
                        ..Default::default()
                    }))
                }
            };

            info!("TTS engine initialized successfully");
            Ok(Self {
                model,
                num_speakers: config.num_speakers,
            })
        }
    }

    impl SpeechEngine for SherpaEngine {
        fn num_speakers(&self) -> Option<i32> {
            self.num_speakers
        }

        fn synthesize(&mut self, text: &str, speaker_id: i32) -> anyhow::Result<SynthesizedAudio> {
            debug!("Synthesizing with speaker {}: {}", speaker_id, text);

            let audio = match &mut self.model {
                Model::Kokoro(tts) => tts.create(text, speaker_id, 1.0),
                Model::Vits(tts) => tts.create(text, speaker_id, 1.0),
            }
            .map_err(|e| anyhow::anyhow!("Synthesis failed: {}", e))?;

            Ok(SynthesizedAudio::new(audio.samples, audio.sample_rate as u32))
        }
    }

    /// sherpa-rs synthesizer backed by a single worker thread
    ///
    /// A `voices_path` in the config selects Kokoro; otherwise the model is
    /// loaded as VITS.
    pub struct SherpaSynthesizer {
        worker: EngineWorker,
    }

    impl SherpaSynthesizer {
        /// Load the model on a worker thread and wait until it is ready
        pub fn new(config: TtsConfig, catalog: VoiceCatalog) -> Result<Self> {
            let queue_size = config.queue_size;
            let worker =
                EngineWorker::spawn(move || SherpaEngine::load(&config), catalog, queue_size)?;
            Ok(Self { worker })
        }

        pub fn catalog(&self) -> &VoiceCatalog {
            self.worker.catalog()
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for SherpaSynthesizer {
        async fn synthesize(&self, text: &str, voice_id: &str) -> anyhow::Result<SynthesizedAudio> {
            self.worker.synthesize(text, voice_id).await
        }
    }
}

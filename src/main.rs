//! voicelab - sentence-by-sentence text-to-speech from the command line

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voicelab::audio::track::AudioTrack;
use voicelab::audio::wav::DEFAULT_FILE_NAME;
use voicelab::integration::{ExecutionMode, OrchestratorBuilder, VoiceLabConfig};
use voicelab::speech::{SherpaSynthesizer, VoiceCatalog};

#[derive(Parser)]
#[command(name = "voicelab")]
#[command(about = "Synthesize text to speech one sentence at a time")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available voices
    Voices {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Synthesize text into a WAV file
    Speak(SpeakArgs),
}

#[derive(Args)]
struct SpeakArgs {
    /// Text to synthesize
    #[arg(short, long)]
    text: String,

    /// Voice id (default from config)
    #[arg(short, long)]
    voice: Option<String>,

    /// Output WAV file
    #[arg(short, long, default_value = DEFAULT_FILE_NAME)]
    output: PathBuf,

    /// Also play the track on the default output device
    #[arg(long)]
    play: bool,

    /// sequential or concurrent
    #[arg(long)]
    mode: Option<ExecutionMode>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the ONNX model
    #[arg(long)]
    model: Option<String>,

    /// Path to the tokens file
    #[arg(long)]
    tokens: Option<String>,

    /// Path to the Kokoro voices file (omit for VITS models)
    #[arg(long)]
    voices: Option<String>,

    /// Speaker count of the model, used to validate the voice catalog
    #[arg(long)]
    num_speakers: Option<i32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voicelab=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Voices { json } => list_voices(json),
        Commands::Speak(args) => speak(args).await,
    }
}

fn list_voices(json: bool) -> Result<()> {
    let catalog = VoiceCatalog::builtin();

    if json {
        println!("{}", serde_json::to_string_pretty(catalog.voices())?);
        return Ok(());
    }

    for voice in catalog.voices() {
        println!("{:<12} {}", voice.id, voice.display_label());
    }
    Ok(())
}

async fn speak(args: SpeakArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => VoiceLabConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => VoiceLabConfig::default(),
    };

    if let Some(mode) = args.mode {
        config.synthesis.mode = mode;
    }
    if let Some(model) = args.model {
        config.tts.model_path = model;
    }
    if let Some(tokens) = args.tokens {
        config.tts.tokens_path = tokens;
    }
    if let Some(voices) = args.voices {
        config.tts.voices_path = Some(voices);
    }
    if let Some(num_speakers) = args.num_speakers {
        config.tts.num_speakers = Some(num_speakers);
    }

    let catalog = VoiceCatalog::builtin();
    let voice = args.voice.unwrap_or_else(|| config.voice.default.clone());
    catalog.require(&voice)?;

    info!("Starting voicelab with voice {}", voice);

    let synthesizer = SherpaSynthesizer::new(config.tts.clone(), catalog.clone())?;
    let orchestrator = OrchestratorBuilder::new(Arc::new(synthesizer))
        .with_config(config.synthesis.clone())
        .with_catalog(catalog)
        .build()?;

    let track = orchestrator.synthesize_text(&args.text, &voice).await?;
    track.to_wav()?.save(&args.output)?;
    println!(
        "Wrote {:.2}s of audio to {}",
        track.duration_secs(),
        args.output.display()
    );

    if args.play {
        play(&track).await?;
    }

    Ok(())
}

#[cfg(feature = "audio-io")]
async fn play(track: &AudioTrack) -> Result<()> {
    use std::time::Duration;
    use voicelab::audio::{CpalSink, PlaybackScheduler};

    let sink = Arc::new(CpalSink::new()?);
    let scheduler = PlaybackScheduler::new(sink);
    let schedule = scheduler.play_track(track).await?;

    // Units play from the device callback; keep the sink alive until they finish
    tokio::time::sleep(Duration::from_secs_f64(schedule.total_duration() + 0.25)).await;
    Ok(())
}

#[cfg(not(feature = "audio-io"))]
async fn play(_track: &AudioTrack) -> Result<()> {
    tracing::warn!("Built without the audio-io feature; skipping playback");
    Ok(())
}

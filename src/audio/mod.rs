//! Audio assembly, export and playback
//!
//! This module provides:
//! - PCM chunk and track containers
//! - Chunk concatenation and 16-bit WAV encoding
//! - Gapless playback scheduling against an injected sink
//! - Frame-level mixing for device output

pub mod assembler;
pub mod mixer;
#[cfg(feature = "audio-io")]
pub mod output;
pub mod resampler;
pub mod scheduler;
pub mod sink;
pub mod track;
pub mod wav;

pub use assembler::concatenate;
pub use mixer::{ActiveUnit, FrameTimeline, Mixer};
#[cfg(feature = "audio-io")]
pub use output::CpalSink;
pub use resampler::{resample_audio, AudioResampler};
pub use scheduler::{schedule_playback, PlaybackSchedule, PlaybackScheduler, ScheduledChunk};
pub use sink::{AudioSink, MemorySink, PlaybackUnit, SinkState};
pub use track::{AudioTrack, PcmChunk};
pub use wav::{decode_wav, encode_wav, read_wav, write_wav, DecodedWav, WavFile};

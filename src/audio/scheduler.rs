//! Gapless playback scheduling
//!
//! Every chunk is submitted to the sink up front with a precomputed start
//! time: the sink clock at scheduling time plus the summed duration of the
//! chunks before it. Each chunk therefore starts exactly when the previous
//! one ends.

use crate::audio::sink::{AudioSink, PlaybackUnit, SinkState};
use crate::audio::track::{AudioTrack, PcmChunk};
use crate::{Result, VoiceLabError};
use std::sync::Arc;
use tracing::{debug, info};

/// A chunk placed on the sink timeline
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledChunk {
    /// Sentence index of the scheduled chunk
    pub sentence_index: usize,

    /// Absolute start time on the sink clock, in seconds
    pub start_time: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// Start times computed for one playback request
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaybackSchedule {
    /// Sink clock when the schedule was computed
    pub origin: f64,

    pub entries: Vec<ScheduledChunk>,
}

impl PlaybackSchedule {
    /// Absolute start times, in order
    pub fn start_times(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.start_time).collect()
    }

    /// Start times relative to the scheduling clock
    pub fn relative_start_times(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.start_time - self.origin).collect()
    }

    /// Sink time at which the last chunk finishes
    pub fn end_time(&self) -> f64 {
        self.entries
            .last()
            .map(|e| e.start_time + e.duration)
            .unwrap_or(self.origin)
    }

    pub fn total_duration(&self) -> f64 {
        self.end_time() - self.origin
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Schedule chunks for gapless sequential playback on `sink`
///
/// Suspended sinks are resumed before the clock is read. Zero-length chunks
/// are skipped. Only one schedule should be active on a sink at a time.
///
/// Submission is not transactional: if the sink rejects a unit, the units
/// already queued stay queued and the error reports how many there were.
pub async fn schedule_playback(
    chunks: &[PcmChunk],
    sample_rate: u32,
    sink: &dyn AudioSink,
) -> Result<PlaybackSchedule> {
    if sample_rate == 0 {
        return Err(VoiceLabError::Config("Sample rate must be greater than 0".into()));
    }

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

    match sink.state() {
        SinkState::Running => {}
        SinkState::Suspended => {
            debug!("Resuming suspended sink before scheduling");
            sink.resume().await?;
        }
        SinkState::Closed => {
            return Err(VoiceLabError::AudioDevice("Audio sink is closed".into()));
        }
    }

    let origin = sink.current_time();
    let rate = sample_rate as f64;

    // Offsets accumulate in samples so start times stay exact multiples of 1/rate
    let mut offset_samples: u64 = 0;
    let mut entries = Vec::with_capacity(chunks.len());
    let mut units = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        if chunk.is_empty() {
            debug!("Skipping empty chunk {}", chunk.sentence_index);
            continue;
        }

        let start_time = origin + offset_samples as f64 / rate;
        entries.push(ScheduledChunk {
            sentence_index: chunk.sentence_index,
            start_time,
            duration: chunk.len() as f64 / rate,
        });
        units.push(PlaybackUnit {
            samples: Arc::from(chunk.samples.as_slice()),
            sample_rate,
            start_time,
        });

        offset_samples += chunk.len() as u64;
    }

    let total = units.len();
    for (queued, unit) in units.into_iter().enumerate() {
        sink.schedule(unit).map_err(|e| match e {
            VoiceLabError::AudioDevice(msg) => VoiceLabError::AudioDevice(format!(
                "{} ({} of {} chunks already queued)",
                msg, queued, total
            )),
            other => other,
        })?;
    }

    let schedule = PlaybackSchedule { origin, entries };
    info!(
        "Scheduled {} chunks ({:.2}s) starting at {:.3}s",
        schedule.len(),
        schedule.total_duration(),
        origin
    );

    Ok(schedule)
}

/// Schedules tracks on an injected sink
#[derive(Clone)]
pub struct PlaybackScheduler {
    sink: Arc<dyn AudioSink>,
}

impl PlaybackScheduler {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &Arc<dyn AudioSink> {
        &self.sink
    }

    /// Schedule chunks at `sample_rate`
    pub async fn schedule(&self, chunks: &[PcmChunk], sample_rate: u32) -> Result<PlaybackSchedule> {
        schedule_playback(chunks, sample_rate, self.sink.as_ref()).await
    }

    /// Schedule every chunk of a track at the track's rate
    pub async fn play_track(&self, track: &AudioTrack) -> Result<PlaybackSchedule> {
        self.schedule(track.chunks(), track.sample_rate()).await
    }
}

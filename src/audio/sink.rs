//! Audio output sinks for scheduled playback

use crate::{Result, VoiceLabError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Lifecycle state of an audio sink
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkState {
    Running,
    Suspended,
    Closed,
}

/// One buffer scheduled to start at an absolute sink time
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackUnit {
    /// Mono samples (f32)
    pub samples: Arc<[f32]>,

    /// Sample rate of `samples`
    pub sample_rate: u32,

    /// Start time on the sink clock, in seconds
    pub start_time: f64,
}

impl PlaybackUnit {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration_secs()
    }
}

/// Audio output destination with its own playback clock
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Current lifecycle state
    fn state(&self) -> SinkState;

    /// Current playback clock, in seconds
    fn current_time(&self) -> f64;

    /// Activate a suspended sink and wait until its clock is running
    async fn resume(&self) -> Result<()>;

    /// Queue a unit to start playing at `unit.start_time`
    fn schedule(&self, unit: PlaybackUnit) -> Result<()>;
}

#[derive(Debug)]
struct MemorySinkInner {
    state: SinkState,
    clock: f64,
    units: Vec<PlaybackUnit>,
    resume_count: usize,
}

/// In-memory sink with a manually driven clock
///
/// Records every scheduled unit and can render the resulting timeline,
/// which makes it suitable for offline rendering and deterministic tests.
#[derive(Clone, Debug)]
pub struct MemorySink {
    inner: Arc<Mutex<MemorySinkInner>>,
}

impl MemorySink {
    /// Create a running sink with its clock at zero
    pub fn new() -> Self {
        Self::with_state(SinkState::Running)
    }

    /// Create a sink that must be resumed before use
    pub fn suspended() -> Self {
        Self::with_state(SinkState::Suspended)
    }

    fn with_state(state: SinkState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemorySinkInner {
                state,
                clock: 0.0,
                units: Vec::new(),
                resume_count: 0,
            })),
        }
    }

    /// Set the clock to an absolute time
    pub fn set_time(&self, seconds: f64) {
        self.inner.lock().clock = seconds;
    }

    /// Move the clock forward
    pub fn advance(&self, seconds: f64) {
        self.inner.lock().clock += seconds;
    }

    pub fn close(&self) {
        self.inner.lock().state = SinkState::Closed;
    }

    /// Units scheduled so far, in submission order
    pub fn units(&self) -> Vec<PlaybackUnit> {
        self.inner.lock().units.clone()
    }

    /// Number of times the sink was resumed
    pub fn resume_count(&self) -> usize {
        self.inner.lock().resume_count
    }

    /// Mix all scheduled units into one buffer starting at clock zero
    ///
    /// Units whose rate differs from `sample_rate` are placed by time but
    /// not resampled.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let inner = self.inner.lock();
        let placements: Vec<(usize, &PlaybackUnit)> = inner
            .units
            .iter()
            .map(|unit| ((unit.start_time * sample_rate as f64).round().max(0.0) as usize, unit))
            .collect();

        let total = placements
            .iter()
            .map(|(offset, unit)| offset + unit.samples.len())
            .max()
            .unwrap_or(0);

        let mut output = vec![0.0f32; total];
        for (offset, unit) in placements {
            for (i, &sample) in unit.samples.iter().enumerate() {
                output[offset + i] += sample;
            }
        }
        output
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSink for MemorySink {
    fn state(&self) -> SinkState {
        self.inner.lock().state
    }

    fn current_time(&self) -> f64 {
        self.inner.lock().clock
    }

    async fn resume(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state == SinkState::Closed {
            return Err(VoiceLabError::AudioDevice("Sink is closed".into()));
        }
        inner.state = SinkState::Running;
        inner.resume_count += 1;
        Ok(())
    }

    fn schedule(&self, unit: PlaybackUnit) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state == SinkState::Closed {
            return Err(VoiceLabError::AudioDevice("Sink is closed".into()));
        }
        debug!(
            "Memory sink scheduled {} samples at {:.4}s",
            unit.samples.len(),
            unit.start_time
        );
        inner.units.push(unit);
        Ok(())
    }
}

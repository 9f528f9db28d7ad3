//! Device-backed audio sink using cpal
//!
//! The cpal stream lives on its own thread because streams are not `Send` on
//! every platform. The sink talks to that thread over channels: control
//! messages start or stop the stream, and scheduled units are handed to the
//! output callback, which mixes them with a [`Mixer`].
//!
//! The sink clock runs [`SCHEDULING_LEAD_SECS`] ahead of the frames rendered
//! by the callback, leaving time to resample and hand over units before
//! their start frame is reached.

use crate::audio::mixer::{ActiveUnit, FrameTimeline, Mixer};
use crate::audio::resampler::resample_audio;
use crate::audio::sink::{AudioSink, PlaybackUnit, SinkState};
use crate::{Result, VoiceLabError};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Offset between the sink clock and the rendered frame count
pub const SCHEDULING_LEAD_SECS: f64 = 0.1;

enum Control {
    Play(Sender<Result<()>>),
    Pause(Sender<Result<()>>),
    Close,
}

/// Audio sink playing through the default output device
///
/// Starts suspended, mirroring a browser audio context; the scheduler
/// resumes it before the first schedule.
pub struct CpalSink {
    sample_rate: u32,
    channels: u16,
    lead_frames: u64,
    frames_rendered: Arc<AtomicU64>,
    timeline: Mutex<FrameTimeline>,
    state: Arc<Mutex<SinkState>>,
    control_tx: Sender<Control>,
    unit_tx: Sender<ActiveUnit>,
    worker: Option<JoinHandle<()>>,
}

impl CpalSink {
    /// Open the default output device
    pub fn new() -> Result<Self> {
        let frames_rendered = Arc::new(AtomicU64::new(0));
        let (control_tx, control_rx) = unbounded();
        let (unit_tx, unit_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded(1);

        let worker_frames = Arc::clone(&frames_rendered);
        let worker = thread::spawn(move || {
            run_stream(control_rx, unit_rx, worker_frames, ready_tx);
        });

        let (sample_rate, channels) = ready_rx
            .recv()
            .map_err(|e| VoiceLabError::AudioDevice(format!("Output thread exited: {}", e)))??;

        Ok(Self {
            sample_rate,
            channels,
            lead_frames: (SCHEDULING_LEAD_SECS * sample_rate as f64).ceil() as u64,
            frames_rendered,
            timeline: Mutex::new(FrameTimeline::new()),
            state: Arc::new(Mutex::new(SinkState::Suspended)),
            control_tx,
            unit_tx,
            worker: Some(worker),
        })
    }

    /// Get the sample rate of the output device
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of device channels
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Pause the stream; the clock stops until the next resume
    pub async fn suspend(&self) -> Result<()> {
        self.request(Control::Pause).await?;
        *self.state.lock() = SinkState::Suspended;
        Ok(())
    }

    /// Stop the stream and release the device
    pub fn close(&mut self) {
        *self.state.lock() = SinkState::Closed;
        let _ = self.control_tx.send(Control::Close);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    async fn request(&self, control: fn(Sender<Result<()>>) -> Control) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.control_tx
            .send(control(reply_tx))
            .map_err(|e| VoiceLabError::AudioDevice(format!("Output thread gone: {}", e)))?;

        tokio::task::spawn_blocking(move || reply_rx.recv())
            .await
            .map_err(|e| VoiceLabError::AudioDevice(format!("Output request failed: {}", e)))?
            .map_err(|e| VoiceLabError::AudioDevice(format!("Output thread gone: {}", e)))?
    }
}

#[async_trait]
impl AudioSink for CpalSink {
    fn state(&self) -> SinkState {
        *self.state.lock()
    }

    fn current_time(&self) -> f64 {
        let frames = self.frames_rendered.load(Ordering::Acquire) + self.lead_frames;
        frames as f64 / self.sample_rate as f64
    }

    async fn resume(&self) -> Result<()> {
        if self.state() == SinkState::Closed {
            return Err(VoiceLabError::AudioDevice("Sink is closed".into()));
        }
        self.request(Control::Play).await?;
        *self.state.lock() = SinkState::Running;
        info!("Started audio playback");
        Ok(())
    }

    fn schedule(&self, unit: PlaybackUnit) -> Result<()> {
        if self.state() == SinkState::Closed {
            return Err(VoiceLabError::AudioDevice("Sink is closed".into()));
        }

        let samples = if unit.sample_rate == self.sample_rate {
            unit.samples.to_vec()
        } else {
            resample_audio(&unit.samples, unit.sample_rate, self.sample_rate)?
        };

        let start_frame = self.timeline.lock().place(
            unit.start_time,
            unit.end_time(),
            self.sample_rate,
            samples.len(),
        );
        debug!(
            "Queueing {} frames at device frame {}",
            samples.len(),
            start_frame
        );

        self.unit_tx
            .send(ActiveUnit::new(start_frame, samples))
            .map_err(|e| VoiceLabError::AudioDevice(format!("Output thread gone: {}", e)))
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_stream(
    control_rx: Receiver<Control>,
    unit_rx: Receiver<ActiveUnit>,
    frames_rendered: Arc<AtomicU64>,
    ready_tx: Sender<Result<(u32, u16)>>,
) {
    let host = cpal::default_host();

    let device = match host.default_output_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err(VoiceLabError::AudioDevice(
                "No output device available".into(),
            )));
            return;
        }
    };

    info!(
        "Using output device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let config: cpal::StreamConfig = match device.default_output_config() {
        Ok(config) => config.into(),
        Err(e) => {
            let _ = ready_tx.send(Err(VoiceLabError::AudioDevice(format!(
                "Failed to get output config: {}",
                e
            ))));
            return;
        }
    };

    let channels = config.channels as usize;
    let mut mixer = Mixer::new();
    let callback_frames = Arc::clone(&frames_rendered);

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let base = callback_frames.load(Ordering::Acquire);
            while let Ok(unit) = unit_rx.try_recv() {
                mixer.admit(unit, base);
            }

            let end = mixer.render(data, channels, base);
            callback_frames.store(end, Ordering::Release);
        },
        |err| {
            error!("Audio output stream error: {}", err);
        },
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(VoiceLabError::AudioDevice(format!(
                "Failed to build output stream: {}",
                e
            ))));
            return;
        }
    };

    // Some backends start streams eagerly
    if let Err(e) = stream.pause() {
        warn!("Could not pause new output stream: {}", e);
    }

    if ready_tx
        .send(Ok((config.sample_rate.0, config.channels)))
        .is_err()
    {
        return;
    }

    while let Ok(control) = control_rx.recv() {
        match control {
            Control::Play(reply) => {
                let result = stream.play().map_err(|e| {
                    VoiceLabError::AudioDevice(format!("Failed to start output stream: {}", e))
                });
                let _ = reply.send(result);
            }
            Control::Pause(reply) => {
                let result = stream.pause().map_err(|e| {
                    VoiceLabError::AudioDevice(format!("Failed to pause output stream: {}", e))
                });
                let _ = reply.send(result);
            }
            Control::Close => break,
        }
    }

    drop(stream);
    info!("Stopped audio playback");
}

//! Frame-level mixing for device output
//!
//! Scheduled units are placed on the device frame timeline by
//! [`FrameTimeline`] and mixed into output buffers by [`Mixer`]. Neither
//! touches a device, so the output callback logic runs the same in tests.

/// A unit converted to device frames
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveUnit {
    /// First device frame of the unit
    pub start_frame: u64,

    /// Mono samples at the device rate
    pub samples: Vec<f32>,
}

impl ActiveUnit {
    pub fn new(start_frame: u64, samples: Vec<f32>) -> Self {
        Self {
            start_frame,
            samples,
        }
    }

    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.samples.len() as u64
    }
}

/// Maps unit start times to device frames
///
/// A unit starting where the previous one ended (within half a device
/// frame) continues at the previous end frame, so resampled neighbours
/// never gap or overlap.
#[derive(Clone, Debug, Default)]
pub struct FrameTimeline {
    /// End of the last placed unit: (seconds, device frame)
    last_end: Option<(f64, u64)>,
}

impl FrameTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a unit spanning `start_time..end_time` seconds that renders
    /// as `frames` device frames at `device_rate`
    pub fn place(&mut self, start_time: f64, end_time: f64, device_rate: u32, frames: usize) -> u64 {
        let rate = device_rate as f64;
        let start_frame = match self.last_end {
            Some((prev_time, prev_frame)) if (start_time - prev_time).abs() < 0.5 / rate => {
                prev_frame
            }
            _ => (start_time * rate).round().max(0.0) as u64,
        };

        self.last_end = Some((end_time, start_frame + frames as u64));
        start_frame
    }
}

/// Mixes active units into interleaved output buffers
///
/// A unit that arrives after its start frame has already been rendered
/// starts at once instead of losing its head; later units continuing it
/// are delayed by the same amount so the run stays gapless.
#[derive(Debug, Default)]
pub struct Mixer {
    active: Vec<ActiveUnit>,

    /// Delay applied to the current contiguous run, in frames
    lag: u64,

    /// Unshifted end frame of the last admitted unit
    last_end: Option<u64>,
}

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a unit; `base` is the next frame to be rendered
    pub fn admit(&mut self, mut unit: ActiveUnit, base: u64) {
        if self.last_end != Some(unit.start_frame) {
            self.lag = 0;
        }
        self.last_end = Some(unit.end_frame());

        unit.start_frame += self.lag;
        if unit.start_frame < base {
            self.lag += base - unit.start_frame;
            unit.start_frame = base;
        }

        self.active.push(unit);
    }

    /// Render frames `base..` into `data` and return the next base frame
    pub fn render(&mut self, data: &mut [f32], channels: usize, base: u64) -> u64 {
        data.fill(0.0);
        let channels = channels.max(1);
        let end = base + (data.len() / channels) as u64;

        for unit in &self.active {
            let from = unit.start_frame.max(base);
            let to = unit.end_frame().min(end);
            for frame in from..to {
                let sample = unit.samples[(frame - unit.start_frame) as usize];
                let out = (frame - base) as usize * channels;
                for slot in &mut data[out..out + channels] {
                    *slot += sample;
                }
            }
        }

        self.active.retain(|unit| unit.end_frame() > end);
        end
    }

    /// Whether nothing is waiting to be played
    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_frames(mixer: &mut Mixer, base: u64, frames: usize) -> Vec<f32> {
        let mut data = vec![0.0; frames];
        mixer.render(&mut data, 1, base);
        data
    }

    #[test]
    fn test_on_time_units_play_in_place() {
        let mut mixer = Mixer::new();
        mixer.admit(ActiveUnit::new(2, vec![1.0, 2.0]), 0);
        mixer.admit(ActiveUnit::new(4, vec![3.0]), 0);

        assert_eq!(render_frames(&mut mixer, 0, 6), vec![0.0, 0.0, 1.0, 2.0, 3.0, 0.0]);
        assert!(mixer.is_idle());
    }

    #[test]
    fn test_late_unit_keeps_its_head() {
        let mut mixer = Mixer::new();
        // Scheduled for frame 0 but the device already rendered 3 frames
        mixer.admit(ActiveUnit::new(0, vec![1.0, 2.0, 3.0, 4.0]), 3);
        mixer.admit(ActiveUnit::new(4, vec![5.0, 6.0]), 3);

        assert_eq!(
            render_frames(&mut mixer, 3, 8),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_lag_resets_for_unrelated_units() {
        let mut mixer = Mixer::new();
        mixer.admit(ActiveUnit::new(0, vec![1.0]), 2);
        let mut data = vec![0.0; 4];
        let next = mixer.render(&mut data, 1, 2);
        assert_eq!(next, 6);
        assert_eq!(data, vec![1.0, 0.0, 0.0, 0.0]);

        // A new run not continuing the previous unit is not delayed
        mixer.admit(ActiveUnit::new(8, vec![7.0]), next);
        assert_eq!(render_frames(&mut mixer, 6, 4), vec![0.0, 0.0, 7.0, 0.0]);
    }

    #[test]
    fn test_render_duplicates_across_channels() {
        let mut mixer = Mixer::new();
        mixer.admit(ActiveUnit::new(1, vec![0.5]), 0);

        let mut data = vec![0.0; 4];
        assert_eq!(mixer.render(&mut data, 2, 0), 2);
        assert_eq!(data, vec![0.0, 0.0, 0.5, 0.5]);
    }

    #[test]
    fn test_unit_spanning_callbacks() {
        let mut mixer = Mixer::new();
        mixer.admit(ActiveUnit::new(0, vec![1.0, 2.0, 3.0]), 0);

        assert_eq!(render_frames(&mut mixer, 0, 2), vec![1.0, 2.0]);
        assert!(!mixer.is_idle());
        assert_eq!(render_frames(&mut mixer, 2, 2), vec![3.0, 0.0]);
        assert!(mixer.is_idle());
    }

    #[test]
    fn test_timeline_keeps_resampled_units_contiguous() {
        let mut timeline = FrameTimeline::new();
        let source_rate = 24000.0;
        let device_rate = 44100;

        // Three chunks of 1000, 2000, 1500 samples at 24 kHz
        let mut start = 0.0;
        let mut expected_next = None;
        for len in [1000usize, 2000, 1500] {
            let end = start + len as f64 / source_rate;
            let frames = (len as f64 * device_rate as f64 / source_rate).ceil() as usize;
            let frame = timeline.place(start, end, device_rate, frames);
            if let Some(next) = expected_next {
                assert_eq!(frame, next);
            }
            expected_next = Some(frame + frames as u64);
            start = end;
        }
    }

    #[test]
    fn test_timeline_rounds_detached_units() {
        let mut timeline = FrameTimeline::new();
        assert_eq!(timeline.place(1.0, 1.5, 48000, 24000), 48000);
        // Gap of a full second starts fresh
        assert_eq!(timeline.place(2.5, 3.0, 48000, 24000), 120000);
    }
}

use crate::{Result, VoiceLabError};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

const CHUNK_FRAMES: usize = 1024;

/// Mono sinc resampler used to match synthesized audio to a device rate
pub struct AudioResampler {
    resampler: SincFixedIn<f32>,
    input_rate: u32,
    output_rate: u32,
}

impl AudioResampler {
    /// Create a new mono resampler
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(VoiceLabError::Config("Sample rates must be greater than 0".into()));
        }

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let resampler = SincFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            params,
            CHUNK_FRAMES,
            1,
        )
        .map_err(|e| VoiceLabError::AudioDevice(format!("Failed to create resampler: {}", e)))?;

        debug!("Created resampler: {} Hz -> {} Hz", input_rate, output_rate);

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
        })
    }

    /// Resample a complete buffer
    ///
    /// The filter delay is removed and the output trimmed so its duration
    /// matches the input.
    pub fn resample(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let ratio = self.output_rate as f64 / self.input_rate as f64;
        let expected = (input.len() as f64 * ratio).ceil() as usize;
        let delay = self.resampler.output_delay();
        let mut output = Vec::with_capacity(expected + delay + CHUNK_FRAMES);

        let mut position = 0;
        while input.len() - position >= self.resampler.input_frames_next() {
            let frames = self.resampler.input_frames_next();
            let block = self
                .resampler
                .process(&[&input[position..position + frames]], None)
                .map_err(|e| VoiceLabError::AudioDevice(format!("Resampling failed: {}", e)))?;
            output.extend_from_slice(&block[0]);
            position += frames;
        }

        if position < input.len() {
            let tail: &[&[f32]] = &[&input[position..]];
            let block = self
                .resampler
                .process_partial(Some(tail), None)
                .map_err(|e| VoiceLabError::AudioDevice(format!("Resampling failed: {}", e)))?;
            output.extend_from_slice(&block[0]);
        }

        // Flush the filter tail
        while output.len() < expected + delay {
            let block = self
                .resampler
                .process_partial(None::<&[&[f32]]>, None)
                .map_err(|e| VoiceLabError::AudioDevice(format!("Resampling failed: {}", e)))?;
            if block[0].is_empty() {
                break;
            }
            output.extend_from_slice(&block[0]);
        }

        output.drain(..delay.min(output.len()));
        output.truncate(expected);
        self.resampler.reset();

        debug!("Resampled {} frames -> {} frames", input.len(), output.len());
        Ok(output)
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }
}

/// Resample a mono buffer in one call
pub fn resample_audio(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    if input_rate == output_rate {
        return Ok(input.to_vec());
    }
    AudioResampler::new(input_rate, output_rate)?.resample(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_rates() {
        assert!(AudioResampler::new(0, 48000).is_err());
        assert!(AudioResampler::new(24000, 0).is_err());
    }

    #[test]
    fn test_same_rate_is_copy() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_audio(&input, 24000, 24000).unwrap(), input);
    }

    #[test]
    fn test_upsample_duration() {
        let input: Vec<f32> = (0..2400).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        let output = resample_audio(&input, 24000, 48000).unwrap();
        assert_eq!(output.len(), 4800);
    }

    #[test]
    fn test_empty_input() {
        let mut resampler = AudioResampler::new(22050, 44100).unwrap();
        assert!(resampler.resample(&[]).unwrap().is_empty());
    }
}

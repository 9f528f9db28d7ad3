//! 16-bit PCM WAV encoding and decoding
//!
//! Encoding produces the canonical 44-byte RIFF/WAVE header followed by
//! interleaved little-endian samples. Float samples are quantized with an
//! asymmetric rule that existing exports depend on:
//! - clamp to [-1, 1]
//! - negative values scale by 32768, non-negative values by 32767
//! - truncate toward zero
//!
//! The browser exporter these files replace only used 32768 below -0.5,
//! so samples in [-0.5, 0) come out one step lower here (-0.25 encodes
//! as -8192 rather than -8191).
//!
//! Decoding applies the inverse scaling, so a round trip is accurate to
//! within 1/32767.

use crate::{Result, VoiceLabError};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Size of the canonical PCM WAV header
pub const WAV_HEADER_LEN: usize = 44;

/// File name offered for downloaded audio
pub const DEFAULT_FILE_NAME: &str = "generated_speech.wav";

/// MIME type of encoded audio
pub const MIME_TYPE: &str = "audio/wav";

const BITS_PER_SAMPLE: u16 = 16;

/// An encoded WAV file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WavFile {
    bytes: Vec<u8>,
}

impl WavFile {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the file to disk
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), &self.bytes)?;
        info!("Wrote {} bytes to WAV file: {:?}", self.bytes.len(), path.as_ref());
        Ok(())
    }
}

impl AsRef<[u8]> for WavFile {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Samples recovered from a WAV file
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedWav {
    /// Interleaved samples (f32)
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedWav {
    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// Quantize one float sample to 16-bit PCM
///
/// NaN maps to silence; infinities clamp to the rails.
pub fn quantize_sample(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let clamped = f64::from(sample.clamp(-1.0, 1.0));
    if clamped < 0.0 {
        (clamped * 32768.0) as i16
    } else {
        (clamped * 32767.0) as i16
    }
}

/// Inverse of [`quantize_sample`]
pub fn dequantize_sample(sample: i16) -> f32 {
    if sample < 0 {
        sample as f32 / 32768.0
    } else {
        sample as f32 / 32767.0
    }
}

/// Encode interleaved samples as a 16-bit PCM WAV file
///
/// # Arguments
/// * `samples` - Interleaved audio samples (f32, range -1.0 to 1.0)
/// * `sample_rate` - Sample rate in Hz
/// * `channels` - Number of channels (1 or 2)
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<WavFile> {
    if !(1..=2).contains(&channels) {
        return Err(VoiceLabError::Encoding(format!(
            "Unsupported channel count: {}",
            channels
        )));
    }

    if sample_rate == 0 {
        return Err(VoiceLabError::Encoding("Sample rate must be greater than 0".into()));
    }

    if samples.len() % channels as usize != 0 {
        return Err(VoiceLabError::Encoding(format!(
            "{} samples do not divide into {} channels",
            samples.len(),
            channels
        )));
    }

    let byte_rate = sample_rate as u64 * 2 * channels as u64;
    if byte_rate > u32::MAX as u64 {
        return Err(VoiceLabError::Encoding(format!(
            "Byte rate for {} Hz with {} channels exceeds the WAV header field",
            sample_rate, channels
        )));
    }

    let data_len = samples.len() as u64 * 2;
    if data_len + (WAV_HEADER_LEN as u64 - 8) > u32::MAX as u64 {
        return Err(VoiceLabError::Encoding(format!(
            "{} samples exceed the WAV size limit",
            samples.len()
        )));
    }

    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(WAV_HEADER_LEN + data_len as usize));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| VoiceLabError::Encoding(format!("Failed to create WAV writer: {}", e)))?;

        for &sample in samples {
            writer
                .write_sample(quantize_sample(sample))
                .map_err(|e| VoiceLabError::Encoding(format!("Failed to write sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| VoiceLabError::Encoding(format!("Failed to finalize WAV file: {}", e)))?;
    }

    let bytes = cursor.into_inner();
    debug!(
        "Encoded {} samples at {} Hz, {} channels into {} bytes",
        samples.len(),
        sample_rate,
        channels,
        bytes.len()
    );

    Ok(WavFile { bytes })
}

/// Decode a 16-bit PCM WAV file
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedWav> {
    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| VoiceLabError::Encoding(format!("Failed to read WAV header: {}", e)))?;

    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != BITS_PER_SAMPLE {
        return Err(VoiceLabError::Encoding(format!(
            "Unsupported WAV format: {:?} {} bits",
            spec.sample_format, spec.bits_per_sample
        )));
    }

    let samples = reader
        .samples::<i16>()
        .map(|s| {
            s.map(dequantize_sample)
                .map_err(|e| VoiceLabError::Encoding(format!("Failed to read sample: {}", e)))
        })
        .collect::<Result<Vec<f32>>>()?;

    debug!(
        "Decoded WAV: {} Hz, {} channels, {} samples",
        spec.sample_rate,
        spec.channels,
        samples.len()
    );

    Ok(DecodedWav {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Encode samples and write them to a WAV file
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
    channels: u16,
) -> Result<()> {
    encode_wav(samples, sample_rate, channels)?.save(path)
}

/// Read and decode a WAV file from disk
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<DecodedWav> {
    let bytes = std::fs::read(path.as_ref())?;
    decode_wav(&bytes)
}

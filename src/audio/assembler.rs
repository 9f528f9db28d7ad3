use crate::audio::track::PcmChunk;

/// Concatenate chunks into one contiguous buffer, preserving order
///
/// The output is allocated once with the exact total length. Live playback
/// should hand the chunks to the scheduler instead.
pub fn concatenate(chunks: &[PcmChunk]) -> Vec<f32> {
    let total: usize = chunks.iter().map(|c| c.samples.len()).sum();
    let mut samples = Vec::with_capacity(total);
    for chunk in chunks {
        samples.extend_from_slice(&chunk.samples);
    }
    samples
}

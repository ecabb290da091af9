//! Amplitude decoding for raw capture chunks
//!
//! Each chunk of little-endian signed 16-bit PCM collapses to a single
//! averaged magnitude in `[0.0, 1.0]`.

use crate::error::DecodeError;
use base64::Engine as _;

/// Full-scale magnitude of a signed 16-bit sample
const FULL_SCALE: f32 = 32768.0;

/// Decode one chunk into its mean normalized amplitude
pub fn decode(chunk: &[u8]) -> Result<f32, DecodeError> {
    if chunk.is_empty() || chunk.len() % 2 != 0 {
        return Err(DecodeError::MalformedChunk { len: chunk.len() });
    }

    let count = chunk.len() / 2;
    let sum: f32 = chunk
        .chunks_exact(2)
        .map(|pair| {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            (sample as f32).abs() / FULL_SCALE
        })
        .sum();

    // Float rounding over long chunks can nudge the mean past full scale
    Ok((sum / count as f32).min(1.0))
}

/// Raw PCM bytes from a base64 chunk, as delivered by encoders that hand out text
pub fn pcm_from_base64(data: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(base64::engine::general_purpose::STANDARD.decode(data.trim())?)
}

/// Encode samples as little-endian PCM bytes
pub fn encode_pcm(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

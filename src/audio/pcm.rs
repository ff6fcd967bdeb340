//! 16-bit little-endian PCM decoding.

use crate::defaults::BYTES_PER_SAMPLE;
use crate::error::{Result, VoicecastError};
use std::ops::Deref;
use std::time::Duration;

/// Divisor mapping an `i16` sample onto `[-1.0, 1.0)`.
///
/// Matches the existing decode path bit for bit; `i16::MAX` would give a
/// different (symmetric) scale.
const NORMALIZATION_DIVISOR: f32 = 32768.0;

/// Interleaved 16-bit signed little-endian PCM bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawAudioBytes(Vec<u8>);

impl RawAudioBytes {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of whole 16-bit samples in the payload.
    pub fn sample_count(&self) -> usize {
        self.0.len() / BYTES_PER_SAMPLE
    }

    /// Whether the length is a whole number of frames for `channels`.
    pub fn is_frame_aligned(&self, channels: u16) -> bool {
        channels > 0 && self.0.len() % (BYTES_PER_SAMPLE * channels as usize) == 0
    }
}

impl From<Vec<u8>> for RawAudioBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Deref for RawAudioBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for RawAudioBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Planar buffer of normalized samples, one `Vec` per channel.
///
/// All channels hold the same number of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl DecodedAudioBuffer {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Samples of one channel, or `None` if `channel` is out of range.
    pub fn channel(&self, channel: usize) -> Option<&[f32]> {
        self.channels.get(channel).map(Vec::as_slice)
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }
}

/// Decode interleaved PCM into a planar normalized buffer.
///
/// Frame count is `bytes.len() / (2 * channels)`; a trailing partial frame
/// (including an odd final byte) is dropped.
///
/// # Errors
/// Returns `VoicecastError::MalformedAudio` if `sample_rate` or `channels` is zero.
pub fn decode_pcm(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<DecodedAudioBuffer> {
    if sample_rate == 0 {
        return Err(VoicecastError::MalformedAudio {
            message: "sample rate must be positive".to_string(),
        });
    }
    if channels == 0 {
        return Err(VoicecastError::MalformedAudio {
            message: "channel count must be positive".to_string(),
        });
    }

    let channel_count = channels as usize;
    let frame_bytes = BYTES_PER_SAMPLE * channel_count;
    let frames = bytes.len() / frame_bytes;

    let mut planes: Vec<Vec<f32>> = (0..channel_count)
        .map(|_| Vec::with_capacity(frames))
        .collect();
    for frame in bytes.chunks_exact(frame_bytes) {
        for (plane, sample) in planes.iter_mut().zip(frame.chunks_exact(BYTES_PER_SAMPLE)) {
            let value = i16::from_le_bytes([sample[0], sample[1]]);
            plane.push(value as f32 / NORMALIZATION_DIVISOR);
        }
    }

    Ok(DecodedAudioBuffer {
        sample_rate,
        channels: planes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn decodes_two_mono_frames() {
        let buffer = decode_pcm(&[0x00, 0x01, 0x00, 0x01], 24000, 1).unwrap();

        assert_eq!(buffer.channel_count(), 1);
        assert_eq!(buffer.frame_count(), 2);
        assert_eq!(buffer.channel(0).unwrap(), &[0.0078125, 0.0078125]);
    }

    #[test]
    fn normalizes_extremes_with_32768_divisor() {
        let buffer = decode_pcm(&pcm(&[i16::MIN, i16::MAX, 0]), 24000, 1).unwrap();
        let samples = buffer.channel(0).unwrap();

        assert_eq!(samples[0], -1.0);
        assert_eq!(samples[1], 32767.0 / 32768.0);
        assert!(samples[1] < 1.0);
        assert_eq!(samples[2], 0.0);
    }

    #[test]
    fn deinterleaves_stereo() {
        let bytes = pcm(&[100, -100, 200, -200, 300, -300]);
        let buffer = decode_pcm(&bytes, 48000, 2).unwrap();

        assert_eq!(buffer.frame_count(), 3);
        assert_eq!(
            buffer.channel(0).unwrap(),
            &[100.0 / 32768.0, 200.0 / 32768.0, 300.0 / 32768.0]
        );
        assert_eq!(
            buffer.channel(1).unwrap(),
            &[-100.0 / 32768.0, -200.0 / 32768.0, -300.0 / 32768.0]
        );
        assert!(buffer.channel(2).is_none());
    }

    #[test]
    fn drops_trailing_odd_byte() {
        let buffer = decode_pcm(&[0x00, 0x01, 0x00, 0x01, 0x7f], 24000, 1).unwrap();
        assert_eq!(buffer.frame_count(), 2);
    }

    #[test]
    fn drops_trailing_partial_frame() {
        // 3 stereo samples = 1 whole frame + half a frame
        let bytes = pcm(&[1, 2, 3]);
        let buffer = decode_pcm(&bytes, 24000, 2).unwrap();

        assert_eq!(buffer.frame_count(), 1);
        assert_eq!(buffer.channel(0).unwrap().len(), 1);
        assert_eq!(buffer.channel(1).unwrap().len(), 1);
    }

    #[test]
    fn frame_count_matches_floor_formula() {
        for channels in 1u16..=4 {
            for len in 0usize..40 {
                let bytes = vec![0u8; len];
                let buffer = decode_pcm(&bytes, 24000, channels).unwrap();
                assert_eq!(
                    buffer.frame_count(),
                    len / (2 * channels as usize),
                    "len={len} channels={channels}"
                );
            }
        }
    }

    #[test]
    fn empty_payload_gives_empty_buffer() {
        let buffer = decode_pcm(&[], 24000, 1).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.duration(), Duration::ZERO);
    }

    #[test]
    fn rejects_zero_channels() {
        assert!(matches!(
            decode_pcm(&[0, 0], 24000, 0),
            Err(VoicecastError::MalformedAudio { .. })
        ));
    }

    #[test]
    fn rejects_zero_sample_rate() {
        assert!(matches!(
            decode_pcm(&[0, 0], 0, 1),
            Err(VoicecastError::MalformedAudio { .. })
        ));
    }

    #[test]
    fn duration_reflects_sample_rate() {
        let bytes = vec![0u8; 24000 * 2];
        let buffer = decode_pcm(&bytes, 24000, 1).unwrap();
        assert_eq!(buffer.duration(), Duration::from_secs(1));
    }

    #[test]
    fn raw_audio_bytes_alignment() {
        let raw = RawAudioBytes::from(vec![0u8; 6]);
        assert_eq!(raw.sample_count(), 3);
        assert!(raw.is_frame_aligned(1));
        assert!(!raw.is_frame_aligned(2));
        assert!(!raw.is_frame_aligned(0));
    }
}

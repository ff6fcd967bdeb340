//! WAV container synthesis for exported clips.

use crate::defaults::{BITS_PER_SAMPLE, CHANNELS, WAV_MIME_TYPE};

/// Size of the canonical RIFF/WAVE header written by [`encode_wav`].
pub const WAV_HEADER_LEN: usize = 44;

const FMT_CHUNK_LEN: u32 = 16;
const FORMAT_PCM: u16 = 1;

/// A complete in-memory WAV file: 44-byte header followed by the PCM payload.
#[derive(Debug, Clone, PartialEq, Eq)]
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

    pub fn mime_type(&self) -> &'static str {
        WAV_MIME_TYPE
    }

    /// PCM payload following the header.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[WAV_HEADER_LEN..]
    }
}

/// Wrap mono 16-bit PCM in a RIFF/WAVE container.
///
/// The payload is copied verbatim. An empty payload still produces a
/// structurally valid (silent) file. Size fields saturate at `u32::MAX` for
/// payloads too large for a RIFF header.
pub fn encode_wav(pcm: &[u8], sample_rate: u32) -> WavFile {
    let (riff_len, data_len) = chunk_sizes(pcm.len());
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate.saturating_mul(u32::from(block_align));

    let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());

    // RIFF header
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&riff_len.to_le_bytes());
    bytes.extend_from_slice(b"WAVE");

    // fmt sub-chunk
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    bytes.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    bytes.extend_from_slice(&CHANNELS.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data sub-chunk
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.extend_from_slice(pcm);

    WavFile { bytes }
}

/// RIFF chunk size and data chunk size for a payload of `payload_len` bytes.
fn chunk_sizes(payload_len: usize) -> (u32, u32) {
    let data_len = u32::try_from(payload_len).unwrap_or(u32::MAX);
    let riff_len = data_len.saturating_add((WAV_HEADER_LEN - 8) as u32);
    (riff_len, data_len)
}

/// Download file name for a history record: `<prefix>-<id>.wav`.
pub fn wav_file_name(prefix: &str, id: &str) -> String {
    format!("{prefix}-{id}.wav")
}

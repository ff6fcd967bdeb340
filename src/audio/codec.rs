//! Base64 transport encoding for audio payloads.
//!
//! The speech API and the history store both carry PCM as base64 text.
//! Decoding follows the forgiving rules of the browser decoder the payloads
//! were produced for: ASCII whitespace is skipped, padding is optional and
//! non-zero trailing bits are discarded.

use crate::audio::pcm::RawAudioBytes;
use crate::error::{Result, VoicecastError};
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use std::borrow::Cow;

const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode a base64 payload into raw PCM bytes.
///
/// # Errors
/// Returns `VoicecastError::InvalidEncoding` if the input contains characters
/// outside the standard alphabet or its length cannot be a base64 encoding.
pub fn decode_base64(input: &str) -> Result<RawAudioBytes> {
    let compact: Cow<'_, str> = if input.bytes().any(|b| b.is_ascii_whitespace()) {
        Cow::Owned(input.chars().filter(|c| !c.is_ascii_whitespace()).collect())
    } else {
        Cow::Borrowed(input)
    };

    FORGIVING
        .decode(compact.as_bytes())
        .map(RawAudioBytes::from)
        .map_err(|e| VoicecastError::InvalidEncoding {
            message: e.to_string(),
        })
}

/// Encode raw bytes as padded standard-alphabet base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

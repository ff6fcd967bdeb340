use crate::audio::codec::decode_base64;
use crate::audio::pcm::RawAudioBytes;
use crate::audio::wav::{WavFile, encode_wav, wav_file_name};
use crate::defaults::CREATED_AT_FORMAT;
use crate::error::Result;
use crate::synthesis::voice::Voice;
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// One successful synthesis, as kept in the history list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioGenerationRecord {
    /// Millisecond timestamp of creation, unique within the history.
    pub id: String,
    pub text: String,
    pub voice: Voice,
    /// Human-readable creation time.
    pub created_at: String,
    /// Base64 PCM as returned by the speech API.
    pub audio: String,
}

impl AudioGenerationRecord {
    /// Build a record created at `now`, with an id strictly greater than
    /// `newest_id` when that id is numeric.
    pub fn new<Tz>(
        text: &str,
        voice: Voice,
        audio: String,
        now: DateTime<Tz>,
        newest_id: Option<&str>,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            id: next_id(now.timestamp_millis(), newest_id),
            text: text.to_string(),
            voice,
            created_at: now.format(CREATED_AT_FORMAT).to_string(),
            audio,
        }
    }

    pub fn decode_audio(&self) -> Result<RawAudioBytes> {
        decode_base64(&self.audio)
    }

    /// Wrap the record's PCM in a WAV container.
    pub fn to_wav(&self, sample_rate: u32) -> Result<WavFile> {
        let pcm = self.decode_audio()?;
        Ok(encode_wav(&pcm, sample_rate))
    }

    pub fn file_name(&self, prefix: &str) -> String {
        wav_file_name(prefix, &self.id)
    }

    /// First `max_chars` characters of the text, with an ellipsis if cut.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}…")
        } else {
            head
        }
    }
}

fn next_id(now_ms: i64, newest_id: Option<&str>) -> String {
    let floor = newest_id
        .and_then(|id| id.parse::<i64>().ok())
        .map_or(i64::MIN, |newest| newest.saturating_add(1));
    now_ms.max(floor).to_string()
}

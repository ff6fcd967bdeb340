//! Default configuration constants for voicecast.
//!
//! Shared between the payload pipeline, the config layer and the CLI so the
//! audio format assumptions live in one place.

/// Sample rate of the PCM returned by the speech API, in Hz.
pub const SAMPLE_RATE: u32 = 24000;

/// Channel count of the PCM returned by the speech API.
pub const CHANNELS: u16 = 1;

/// Bits per PCM sample.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Bytes per PCM sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Maximum number of records kept in the generation history.
pub const HISTORY_CAPACITY: usize = 20;

/// Key under which the history list is persisted.
pub const HISTORY_KEY: &str = "voicecast.history";

/// Prefix of downloaded WAV file names (`<prefix>-<id>.wav`).
pub const DOWNLOAD_PREFIX: &str = "voicecast";

/// MIME type of exported audio.
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Default speech synthesis model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Default speech synthesis endpoint (the model name is appended).
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Display format for record creation times.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

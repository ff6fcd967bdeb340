//! voicecast - Text-to-speech narration studio
//!
//! Synthesizes narration through a hosted speech API, plays the returned
//! 24kHz PCM through the audio output, and keeps a capped history of clips
//! that can be replayed or exported as WAV files.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod history;
pub mod studio;
pub mod synthesis;

// Payload pipeline
pub use audio::codec::{decode_base64, encode_base64};
pub use audio::pcm::{DecodedAudioBuffer, RawAudioBytes, decode_pcm};
pub use audio::playback::{OutputContext, PlaybackController, PlaybackState, SourceNode};
pub use audio::wav::{WavFile, encode_wav};

// History
pub use history::record::AudioGenerationRecord;
pub use history::store::{FileStore, KeyValueStore, MemoryStore};
pub use history::HistoryStore;

// Synthesis
pub use synthesis::provider::SpeechSynthesizer;
pub use synthesis::voice::{Gender, Voice};

// Composition
pub use studio::Studio;

// Error handling
pub use error::{Result, VoicecastError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

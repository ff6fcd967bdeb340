//! Error types for voicecast.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoicecastError {
    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Payload errors
    #[error("Invalid base64 audio payload: {message}")]
    InvalidEncoding { message: String },

    #[error("Malformed audio: {message}")]
    MalformedAudio { message: String },

    // Playback errors
    #[error("Audio output device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Playback failed: {message}")]
    Playback { message: String },

    // Synthesis errors
    #[error("Speech synthesis failed: {message}")]
    SynthesisFailure { message: String },

    #[error("Nothing to synthesize: text is empty")]
    EmptyText,

    // History errors
    #[error("History storage error: {message}")]
    History { message: String },

    #[error("No history record with id {id}")]
    RecordNotFound { id: String },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoicecastError>;

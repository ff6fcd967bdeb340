use crate::defaults;
use crate::error::{Result, VoicecastError};
use crate::synthesis::voice::Voice;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub synthesis: SynthesisConfig,
    pub playback: PlaybackConfig,
    pub history: HistoryConfig,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub voice: Voice,
}

/// Audio playback configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub autoplay: bool,
}

/// Generation history configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub dir: Option<PathBuf>,
    pub capacity: usize,
    pub download_prefix: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: defaults::DEFAULT_MODEL.to_string(),
            endpoint: defaults::DEFAULT_ENDPOINT.to_string(),
            voice: Voice::default(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            autoplay: true,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: None,
            capacity: defaults::HISTORY_CAPACITY,
            download_prefix: defaults::DOWNLOAD_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, contains invalid TOML,
    /// or holds out-of-range values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(VoicecastError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.playback.sample_rate == 0 {
            return Err(VoicecastError::ConfigInvalidValue {
                key: "playback.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.history.capacity == 0 {
            return Err(VoicecastError::ConfigInvalidValue {
                key: "history.capacity".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOICECAST_API_KEY → synthesis.api_key
    /// - VOICECAST_MODEL → synthesis.model
    /// - VOICECAST_VOICE → synthesis.voice (ignored if not a known voice)
    /// - VOICECAST_HISTORY_DIR → history.dir
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("VOICECAST_API_KEY")
            && !key.is_empty()
        {
            self.synthesis.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("VOICECAST_MODEL")
            && !model.is_empty()
        {
            self.synthesis.model = model;
        }

        if let Ok(voice) = std::env::var("VOICECAST_VOICE")
            && let Ok(voice) = voice.parse::<Voice>()
        {
            self.synthesis.voice = voice;
        }

        if let Ok(dir) = std::env::var("VOICECAST_HISTORY_DIR")
            && !dir.is_empty()
        {
            self.history.dir = Some(PathBuf::from(dir));
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voicecast/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("voicecast")
            .join("config.toml")
    }
}

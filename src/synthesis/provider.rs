use crate::error::{Result, VoicecastError};
use crate::synthesis::voice::Voice;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Trait for text-to-speech backends.
///
/// Implementations return the synthesized audio as base64-encoded 16-bit
/// little-endian PCM, 24kHz mono.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` in `voice`.
    ///
    /// # Errors
    /// Returns `VoicecastError::SynthesisFailure` if the backend rejects the
    /// request or returns no audio.
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<String>;

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "synthesizer"
    }
}

/// Mock synthesizer for testing
#[derive(Debug, Clone)]
pub struct MockSynthesizer {
    audio: String,
    should_fail: bool,
    error_message: String,
    requests: Arc<Mutex<Vec<(String, Voice)>>>,
}

impl MockSynthesizer {
    /// Create a mock returning two frames of quiet audio
    pub fn new() -> Self {
        Self {
            audio: "AAEAAQ==".to_string(),
            should_fail: false,
            error_message: "mock synthesis error".to_string(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Configure the base64 payload to return
    pub fn with_audio(mut self, base64_audio: &str) -> Self {
        self.audio = base64_audio.to_string();
        self
    }

    /// Configure the mock to fail every request
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<(String, Voice)> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((text.to_string(), voice));
        }
        if self.should_fail {
            Err(VoicecastError::SynthesisFailure {
                message: self.error_message.clone(),
            })
        } else {
            Ok(self.audio.clone())
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

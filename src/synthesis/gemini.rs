//! Gemini text-to-speech client.
//!
//! Sends a `generateContent` request asking for an AUDIO response in one of
//! the prebuilt voices; the reply carries base64 PCM (24kHz mono) as inline
//! data on the first candidate.

use crate::defaults;
use crate::error::{Result, VoicecastError};
use crate::synthesis::provider::SpeechSynthesizer;
use crate::synthesis::voice::Voice;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
}

impl GeminiConfig {
    fn url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: defaults::DEFAULT_MODEL.to_string(),
            endpoint: defaults::DEFAULT_ENDPOINT.to_string(),
        }
    }
}

pub struct GeminiSynthesizer {
    config: GeminiConfig,
    client: Client,
}

impl GeminiSynthesizer {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'static str; 1],
    speech_config: SpeechConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn build_request(text: &str, voice: Voice) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![TextPart { text }],
        }],
        generation_config: GenerationConfig {
            response_modalities: ["AUDIO"],
            speech_config: SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: voice.name(),
                    },
                },
            },
        },
    }
}

/// Pull the base64 audio out of the first candidate's first inline part.
fn extract_audio(response: GenerateResponse) -> Result<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.inline_data))
        .map(|inline| inline.data)
        .filter(|data| !data.is_empty())
        .ok_or_else(|| VoicecastError::SynthesisFailure {
            message: "response contained no audio".to_string(),
        })
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => format!("{} ({})", parsed.error.message, status),
        Err(_) => format!("request failed with status {}", status),
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiSynthesizer {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| VoicecastError::SynthesisFailure {
                message: "no API key configured (set VOICECAST_API_KEY)".to_string(),
            })?;

        debug!(model = %self.config.model, %voice, chars = text.chars().count(), "requesting speech");

        let response = self
            .client
            .post(self.config.url())
            .header("x-goog-api-key", api_key)
            .json(&build_request(text, voice))
            .send()
            .await
            .map_err(|e| VoicecastError::SynthesisFailure {
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VoicecastError::SynthesisFailure {
                message: format!("failed to read response: {e}"),
            })?;

        if !status.is_success() {
            return Err(VoicecastError::SynthesisFailure {
                message: error_message(status, &body),
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| VoicecastError::SynthesisFailure {
                message: format!("unexpected response: {e}"),
            })?;
        let audio = extract_audio(parsed)?;
        info!(%voice, payload_len = audio.len(), "speech synthesized");
        Ok(audio)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

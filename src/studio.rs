//! Narration studio: synthesis, playback and history wired together.

use crate::audio::codec::decode_base64;
use crate::audio::playback::{ContextFactory, PlaybackController, PlaybackState};
use crate::audio::wav::WavFile;
use crate::config::Config;
use crate::defaults;
use crate::error::{Result, VoicecastError};
use crate::history::HistoryStore;
use crate::history::record::AudioGenerationRecord;
use crate::history::store::KeyValueStore;
use crate::synthesis::provider::SpeechSynthesizer;
use crate::synthesis::voice::Voice;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub struct Studio<S: KeyValueStore, T: SpeechSynthesizer> {
    synthesizer: T,
    playback: PlaybackController,
    history: HistoryStore<S>,
    sample_rate: u32,
    download_prefix: String,
    autoplay: bool,
}

impl<S: KeyValueStore, T: SpeechSynthesizer> Studio<S, T> {
    /// Assemble a studio from configuration.
    ///
    /// Loads the history from `store`; the output context is not created
    /// until something is played.
    pub fn from_config(config: &Config, synthesizer: T, store: S, factory: ContextFactory) -> Self {
        let playback = PlaybackController::new(factory)
            .with_format(config.playback.sample_rate, defaults::CHANNELS);
        let history =
            HistoryStore::open_with(store, defaults::HISTORY_KEY, config.history.capacity);

        Self {
            synthesizer,
            playback,
            history,
            sample_rate: config.playback.sample_rate,
            download_prefix: config.history.download_prefix.clone(),
            autoplay: config.playback.autoplay,
        }
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_download_prefix(mut self, prefix: &str) -> Self {
        self.download_prefix = prefix.to_string();
        self
    }

    /// Synthesize `text`, record it and (with autoplay) start playing it.
    ///
    /// Nothing is recorded unless the returned payload decodes to audio.
    /// A playback failure after recording is logged, not returned: the clip
    /// stays in the history and can be replayed.
    ///
    /// # Errors
    /// `EmptyText` for blank input, the synthesizer's error, a payload
    /// decode error, or a history write error.
    pub async fn generate(&mut self, text: &str, voice: Voice) -> Result<AudioGenerationRecord> {
        if text.trim().is_empty() {
            return Err(VoicecastError::EmptyText);
        }

        info!(
            synthesizer = self.synthesizer.name(),
            %voice,
            chars = text.chars().count(),
            "synthesizing"
        );
        let audio = self.synthesizer.synthesize(text, voice).await?;

        let pcm = decode_base64(&audio)?;
        if pcm.sample_count() == 0 {
            return Err(VoicecastError::SynthesisFailure {
                message: "response contained no audio samples".to_string(),
            });
        }
        if !pcm.is_frame_aligned(defaults::CHANNELS) {
            warn!(bytes = pcm.len(), "payload ends in a partial frame, it will be dropped");
        }

        let record = self.history.add(text, voice, audio)?;
        info!(id = %record.id, bytes = pcm.len(), "generation recorded");

        if self.autoplay
            && let Err(e) = self.playback.play(&record.audio)
        {
            warn!(id = %record.id, error = %e, "autoplay failed");
        }

        Ok(record)
    }

    /// Play the history record `id`, replacing anything already playing.
    pub fn play(&mut self, id: &str) -> Result<()> {
        let audio = self.record(id)?.audio.clone();
        self.playback.play(&audio)
    }

    pub fn stop(&mut self) {
        self.playback.stop();
    }

    pub fn playback_state(&mut self) -> PlaybackState {
        self.playback.state()
    }

    /// Block until the current clip finishes or `timeout` elapses.
    pub fn wait_until_idle(&mut self, timeout: Duration) -> bool {
        self.playback.wait_until_idle(timeout)
    }

    /// Build the download file name and WAV bytes for record `id`.
    pub fn export_wav(&self, id: &str) -> Result<(String, WavFile)> {
        let record = self.record(id)?;
        let wav = record.to_wav(self.sample_rate)?;
        Ok((record.file_name(&self.download_prefix), wav))
    }

    /// Write record `id` as a WAV file into `dir`, creating it if needed.
    pub fn save_wav(&self, id: &str, dir: &Path) -> Result<PathBuf> {
        let (file_name, wav) = self.export_wav(id)?;
        fs::create_dir_all(dir)?;
        let path = dir.join(file_name);
        fs::write(&path, wav.as_bytes())?;
        info!(path = %path.display(), bytes = wav.len(), "wav exported");
        Ok(path)
    }

    /// Remove record `id`. Returns `false` if no such record existed.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        self.history.delete(id)
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear()
    }

    /// Records, most recent first.
    pub fn history(&self) -> &[AudioGenerationRecord] {
        self.history.records()
    }

    /// Stop playback and release the audio output.
    pub fn shutdown(&mut self) {
        self.playback.shutdown();
    }

    fn record(&self, id: &str) -> Result<&AudioGenerationRecord> {
        self.history
            .get(id)
            .ok_or_else(|| VoicecastError::RecordNotFound { id: id.to_string() })
    }
}

//! Playback lifecycle: one output context, at most one sounding source.
//!
//! The controller owns the output context (created lazily by a factory on the
//! first play request, kept until [`PlaybackController::shutdown`]) and the
//! currently active source. Sources report natural completion through a
//! channel; each completion carries the generation of the source that sent it
//! so a late signal from a replaced source cannot end a newer playback.

use crate::audio::codec::decode_base64;
use crate::audio::pcm::{DecodedAudioBuffer, decode_pcm};
use crate::defaults;
use crate::error::{Result, VoicecastError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Playback state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
}

/// One-shot "playback ended" signal handed to a source when it starts.
pub struct Completion {
    generation: u64,
    tx: Sender<u64>,
}

impl Completion {
    /// Report that the source played to the end.
    pub fn complete(self) {
        if self.tx.send(self.generation).is_err() {
            debug!(generation = self.generation, "controller gone, completion dropped");
        }
    }
}

/// A single playable source bound to one decoded buffer.
pub trait SourceNode: Send {
    /// Begin output immediately. `on_ended` must be completed when the
    /// buffer has been played to the end, and not at all after `stop`.
    fn start(&mut self, on_ended: Completion) -> Result<()>;

    /// Halt output immediately.
    fn stop(&mut self);
}

/// The audio output context sources are created from.
pub trait OutputContext: Send {
    fn create_source(&mut self, buffer: DecodedAudioBuffer) -> Result<Box<dyn SourceNode>>;
}

/// Creates the output context on the first play request.
pub type ContextFactory = Box<dyn FnMut() -> Result<Box<dyn OutputContext>> + Send>;

struct ActiveSource {
    generation: u64,
    node: Box<dyn SourceNode>,
}

pub struct PlaybackController {
    factory: ContextFactory,
    context: Option<Box<dyn OutputContext>>,
    active: Option<ActiveSource>,
    generation: u64,
    sample_rate: u32,
    channels: u16,
    completion_tx: Sender<u64>,
    completion_rx: Receiver<u64>,
}

impl PlaybackController {
    /// Create a controller for 24kHz mono payloads.
    ///
    /// `factory` is not called until the first play request.
    pub fn new(factory: ContextFactory) -> Self {
        let (completion_tx, completion_rx) = crossbeam_channel::unbounded();
        Self {
            factory,
            context: None,
            active: None,
            generation: 0,
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
            completion_tx,
            completion_rx,
        }
    }

    /// Override the PCM format payloads are decoded with.
    pub fn with_format(mut self, sample_rate: u32, channels: u16) -> Self {
        self.sample_rate = sample_rate;
        self.channels = channels;
        self
    }

    /// Current state, after applying any pending completion signals.
    pub fn state(&mut self) -> PlaybackState {
        self.poll_completions();
        if self.active.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        }
    }

    /// Whether the output context has been created and not yet released.
    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Stop whatever is playing, decode `base64_audio` and play it.
    ///
    /// # Errors
    /// A payload that does not decode is reported as `InvalidEncoding` (or
    /// `MalformedAudio` for an unusable format), never wrapped in `Playback`.
    /// `Playback`/`AudioDeviceNotFound` come only from the output context.
    /// In every error case the controller is left `Idle`.
    pub fn play(&mut self, base64_audio: &str) -> Result<()> {
        self.stop();
        let bytes = decode_base64(base64_audio)?;
        let buffer = decode_pcm(&bytes, self.sample_rate, self.channels)?;
        self.play_buffer(buffer)
    }

    /// Stop whatever is playing and play an already decoded buffer.
    pub fn play_buffer(&mut self, buffer: DecodedAudioBuffer) -> Result<()> {
        self.stop();

        let frames = buffer.frame_count();
        let duration_ms = buffer.duration().as_millis() as u64;
        let context = self.ensure_context()?;
        let mut node = context.create_source(buffer)?;

        self.generation += 1;
        let generation = self.generation;
        node.start(Completion {
            generation,
            tx: self.completion_tx.clone(),
        })?;

        info!(generation, frames, duration_ms, "playback started");
        self.active = Some(ActiveSource { generation, node });
        Ok(())
    }

    /// Halt the active source. No-op when idle.
    pub fn stop(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.node.stop();
            info!(generation = active.generation, "playback stopped");
        }
    }

    /// Block until the active source finishes or `timeout` elapses.
    ///
    /// Returns `true` if the controller is idle on return.
    pub fn wait_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let Some(current) = self.active.as_ref().map(|a| a.generation) else {
                return true;
            };
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.completion_rx.recv_timeout(remaining) {
                Ok(generation) => self.apply_completion(generation, current),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => return self.active.is_none(),
            }
        }
    }

    /// Stop playback and release the output context.
    ///
    /// A later play request creates a fresh context.
    pub fn shutdown(&mut self) {
        self.stop();
        if self.context.take().is_some() {
            debug!("output context released");
        }
    }

    fn ensure_context(&mut self) -> Result<&mut Box<dyn OutputContext>> {
        if self.context.is_none() {
            let context = (self.factory)()?;
            debug!("output context created");
            self.context = Some(context);
        }
        self.context.as_mut().ok_or_else(|| VoicecastError::Playback {
            message: "output context unavailable".to_string(),
        })
    }

    fn poll_completions(&mut self) {
        while let Ok(generation) = self.completion_rx.try_recv() {
            match self.active.as_ref().map(|a| a.generation) {
                Some(current) => self.apply_completion(generation, current),
                None => debug!(generation, "ignoring completion while idle"),
            }
        }
    }

    fn apply_completion(&mut self, generation: u64, current: u64) {
        if generation == current {
            self.active = None;
            info!(generation, "playback finished");
        } else {
            debug!(generation, current, "ignoring stale completion");
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Observable effects of [`MockOutput`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    ContextCreated,
    SourceCreated { source: usize, frames: usize },
    SourceStarted { source: usize },
    SourceStopped { source: usize },
}

#[derive(Default)]
struct MockOutputState {
    events: Vec<PlaybackEvent>,
    completions: Vec<Option<Completion>>,
    buffers: Vec<DecodedAudioBuffer>,
}

/// Mock audio output for testing.
///
/// Cloning shares the recorded state, so a test can keep one handle while the
/// controller owns the context built by [`MockOutput::factory`].
#[derive(Clone, Default)]
pub struct MockOutput {
    state: Arc<Mutex<MockOutputState>>,
    should_fail_context: bool,
    should_fail_source: bool,
    should_fail_start: bool,
}

impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the factory to fail creating the output context
    pub fn with_context_failure(mut self) -> Self {
        self.should_fail_context = true;
        self
    }

    /// Configure the context to fail creating sources
    pub fn with_source_failure(mut self) -> Self {
        self.should_fail_source = true;
        self
    }

    /// Configure sources to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Factory to hand to [`PlaybackController::new`].
    pub fn factory(&self) -> ContextFactory {
        let output = self.clone();
        Box::new(move || {
            if output.should_fail_context {
                return Err(VoicecastError::AudioDeviceNotFound {
                    device: "mock".to_string(),
                });
            }
            output.record(PlaybackEvent::ContextCreated);
            Ok(Box::new(output.clone()) as Box<dyn OutputContext>)
        })
    }

    pub fn events(&self) -> Vec<PlaybackEvent> {
        self.state
            .lock()
            .map(|s| s.events.clone())
            .unwrap_or_default()
    }

    pub fn contexts_created(&self) -> usize {
        self.count(|e| matches!(e, PlaybackEvent::ContextCreated))
    }

    pub fn stop_count(&self, source: usize) -> usize {
        self.count(|e| *e == PlaybackEvent::SourceStopped { source })
    }

    pub fn start_count(&self, source: usize) -> usize {
        self.count(|e| *e == PlaybackEvent::SourceStarted { source })
    }

    /// Buffer that source `source` was created with.
    pub fn buffer(&self, source: usize) -> Option<DecodedAudioBuffer> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.buffers.get(source).cloned())
    }

    /// Simulate source `source` playing to the end.
    ///
    /// Returns `false` if the source never started or already finished.
    pub fn finish(&self, source: usize) -> bool {
        let completion = self
            .state
            .lock()
            .ok()
            .and_then(|mut s| s.completions.get_mut(source).and_then(Option::take));
        match completion {
            Some(completion) => {
                completion.complete();
                true
            }
            None => false,
        }
    }

    fn record(&self, event: PlaybackEvent) {
        if let Ok(mut s) = self.state.lock() {
            s.events.push(event);
        }
    }

    fn count(&self, predicate: impl Fn(&PlaybackEvent) -> bool) -> usize {
        self.state
            .lock()
            .map(|s| s.events.iter().filter(|e| predicate(e)).count())
            .unwrap_or(0)
    }
}

impl OutputContext for MockOutput {
    fn create_source(&mut self, buffer: DecodedAudioBuffer) -> Result<Box<dyn SourceNode>> {
        if self.should_fail_source {
            return Err(VoicecastError::Playback {
                message: "mock source error".to_string(),
            });
        }
        let mut state = self.state.lock().map_err(|e| VoicecastError::Playback {
            message: format!("Failed to lock mock state: {}", e),
        })?;
        let source = state.buffers.len();
        state.events.push(PlaybackEvent::SourceCreated {
            source,
            frames: buffer.frame_count(),
        });
        state.buffers.push(buffer);
        state.completions.push(None);
        Ok(Box::new(MockSource {
            source,
            output: self.clone(),
        }))
    }
}

struct MockSource {
    source: usize,
    output: MockOutput,
}

impl SourceNode for MockSource {
    fn start(&mut self, on_ended: Completion) -> Result<()> {
        if self.output.should_fail_start {
            return Err(VoicecastError::Playback {
                message: "mock start error".to_string(),
            });
        }
        let mut state = self
            .output
            .state
            .lock()
            .map_err(|e| VoicecastError::Playback {
                message: format!("Failed to lock mock state: {}", e),
            })?;
        state.events.push(PlaybackEvent::SourceStarted {
            source: self.source,
        });
        if let Some(slot) = state.completions.get_mut(self.source) {
            *slot = Some(on_ended);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if let Ok(mut state) = self.output.state.lock() {
            state.events.push(PlaybackEvent::SourceStopped {
                source: self.source,
            });
            // A stopped source never reports completion.
            if let Some(slot) = state.completions.get_mut(self.source) {
                slot.take();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::codec::encode_base64;

    const CLIP_A: &str = "AAEAAQ==";

    fn clip_b() -> String {
        encode_base64(&[0x10, 0x00, 0x20, 0x00, 0x30, 0x00])
    }

    fn controller(output: &MockOutput) -> PlaybackController {
        PlaybackController::new(output.factory())
    }

    #[test]
    fn starts_idle_without_context() {
        let output = MockOutput::new();
        let mut playback = controller(&output);

        assert_eq!(playback.state(), PlaybackState::Idle);
        assert!(!playback.has_context());
        assert_eq!(output.contexts_created(), 0);
    }

    #[test]
    fn play_creates_context_lazily_and_plays() {
        let output = MockOutput::new();
        let mut playback = controller(&output);

        playback.play(CLIP_A).unwrap();

        assert_eq!(playback.state(), PlaybackState::Playing);
        assert!(playback.has_context());
        assert_eq!(
            output.events(),
            vec![
                PlaybackEvent::ContextCreated,
                PlaybackEvent::SourceCreated {
                    source: 0,
                    frames: 2
                },
                PlaybackEvent::SourceStarted { source: 0 },
            ]
        );
        let buffer = output.buffer(0).unwrap();
        assert_eq!(buffer.sample_rate(), 24000);
        assert_eq!(buffer.channel(0).unwrap(), &[0.0078125, 0.0078125]);
    }

    #[test]
    fn context_is_reused_across_plays() {
        let output = MockOutput::new();
        let mut playback = controller(&output);

        playback.play(CLIP_A).unwrap();
        playback.play(CLIP_A).unwrap();
        playback.play(CLIP_A).unwrap();

        assert_eq!(output.contexts_created(), 1);
    }

    #[test]
    fn second_play_stops_first_before_starting() {
        let output = MockOutput::new();
        let mut playback = controller(&output);

        playback.play(CLIP_A).unwrap();
        playback.play(&clip_b()).unwrap();

        assert_eq!(playback.state(), PlaybackState::Playing);
        assert_eq!(output.stop_count(0), 1);
        assert_eq!(output.stop_count(1), 0);
        assert_eq!(output.buffer(1).unwrap().frame_count(), 3);

        let events = output.events();
        let stopped_a = events
            .iter()
            .position(|e| *e == PlaybackEvent::SourceStopped { source: 0 })
            .unwrap();
        let started_b = events
            .iter()
            .position(|e| *e == PlaybackEvent::SourceStarted { source: 1 })
            .unwrap();
        assert!(stopped_a < started_b);
    }

    #[test]
    fn natural_completion_returns_to_idle() {
        let output = MockOutput::new();
        let mut playback = controller(&output);

        playback.play(CLIP_A).unwrap();
        assert!(output.finish(0));

        assert_eq!(playback.state(), PlaybackState::Idle);
        assert_eq!(output.stop_count(0), 0);
    }

    #[test]
    fn stale_completion_does_not_end_newer_playback() {
        let output = MockOutput::new();
        let mut playback = controller(&output);

        playback.play(CLIP_A).unwrap();

        // Capture A's completion before it is replaced, then fire it late.
        let stale = {
            let mut state = output.state.lock().unwrap();
            state.completions[0].take().unwrap()
        };
        playback.play(&clip_b()).unwrap();
        stale.complete();

        assert_eq!(playback.state(), PlaybackState::Playing);
        assert!(output.finish(1));
        assert_eq!(playback.state(), PlaybackState::Idle);
    }

    #[test]
    fn stop_halts_active_source() {
        let output = MockOutput::new();
        let mut playback = controller(&output);

        playback.play(CLIP_A).unwrap();
        playback.stop();

        assert_eq!(playback.state(), PlaybackState::Idle);
        assert_eq!(output.stop_count(0), 1);
        assert!(!output.finish(0));
    }

    #[test]
    fn stop_when_idle_is_noop() {
        let output = MockOutput::new();
        let mut playback = controller(&output);

        playback.stop();
        playback.stop();

        assert!(output.events().is_empty());
        assert_eq!(playback.state(), PlaybackState::Idle);
    }

    #[test]
    fn malformed_payload_changes_nothing_when_idle() {
        let output = MockOutput::new();
        let mut playback = controller(&output);

        let result = playback.play("not*base64!");

        assert!(matches!(result, Err(VoicecastError::InvalidEncoding { .. })));
        assert_eq!(playback.state(), PlaybackState::Idle);
        assert!(output.events().is_empty());
        assert!(!playback.has_context());
    }

    #[test]
    fn malformed_payload_while_playing_stops_and_idles() {
        let output = MockOutput::new();
        let mut playback = controller(&output);

        playback.play(CLIP_A).unwrap();
        let result = playback.play("%%%");

        assert!(matches!(result, Err(VoicecastError::InvalidEncoding { .. })));
        assert_eq!(playback.state(), PlaybackState::Idle);
        assert_eq!(output.stop_count(0), 1);
    }

    #[test]
    fn context_failure_surfaces_and_stays_idle() {
        let output = MockOutput::new().with_context_failure();
        let mut playback = controller(&output);

        let result = playback.play(CLIP_A);

        assert!(matches!(
            result,
            Err(VoicecastError::AudioDeviceNotFound { .. })
        ));
        assert_eq!(playback.state(), PlaybackState::Idle);
        assert!(!playback.has_context());
    }

    #[test]
    fn start_failure_surfaces_and_stays_idle() {
        let output = MockOutput::new().with_start_failure();
        let mut playback = controller(&output);

        let result = playback.play(CLIP_A);

        assert!(matches!(result, Err(VoicecastError::Playback { .. })));
        assert_eq!(playback.state(), PlaybackState::Idle);
        assert!(playback.has_context());
    }

    #[test]
    fn source_failure_surfaces_and_stays_idle() {
        let output = MockOutput::new().with_source_failure();
        let mut playback = controller(&output);

        assert!(playback.play(CLIP_A).is_err());
        assert_eq!(playback.state(), PlaybackState::Idle);
    }

    #[test]
    fn shutdown_releases_context_and_next_play_recreates_it() {
        let output = MockOutput::new();
        let mut playback = controller(&output);

        playback.play(CLIP_A).unwrap();
        playback.shutdown();

        assert!(!playback.has_context());
        assert_eq!(output.stop_count(0), 1);

        playback.play(CLIP_A).unwrap();
        assert_eq!(output.contexts_created(), 2);
    }

    #[test]
    fn wait_until_idle_returns_after_completion() {
        let output = MockOutput::new();
        let mut playback = controller(&output);
        playback.play(CLIP_A).unwrap();

        let finisher = output.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            finisher.finish(0)
        });

        assert!(playback.wait_until_idle(Duration::from_secs(5)));
        assert!(handle.join().unwrap());
        assert_eq!(playback.state(), PlaybackState::Idle);
    }

    #[test]
    fn wait_until_idle_times_out_while_playing() {
        let output = MockOutput::new();
        let mut playback = controller(&output);
        playback.play(CLIP_A).unwrap();

        assert!(!playback.wait_until_idle(Duration::from_millis(10)));
        assert_eq!(playback.state(), PlaybackState::Playing);
    }

    #[test]
    fn wait_until_idle_when_idle_returns_immediately() {
        let output = MockOutput::new();
        let mut playback = controller(&output);
        assert!(playback.wait_until_idle(Duration::ZERO));
    }

    #[test]
    fn drop_stops_active_source() {
        let output = MockOutput::new();
        {
            let mut playback = controller(&output);
            playback.play(CLIP_A).unwrap();
        }
        assert_eq!(output.stop_count(0), 1);
    }

    #[test]
    fn custom_format_decodes_stereo() {
        let output = MockOutput::new();
        let mut playback = controller(&output).with_format(48000, 2);

        playback.play(CLIP_A).unwrap();

        let buffer = output.buffer(0).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 1);
        assert_eq!(buffer.sample_rate(), 48000);
    }
}

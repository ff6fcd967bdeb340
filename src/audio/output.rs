//! Real audio output using CPAL (Cross-Platform Audio Library).

use crate::audio::pcm::DecodedAudioBuffer;
use crate::audio::playback::{Completion, ContextFactory, OutputContext, SourceNode};
use crate::error::{Result, VoicecastError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, StreamConfig, SupportedStreamConfig};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// CPAL queries ALSA/JACK/PipeWire backends when enumerating devices and those
/// backends print harmless but confusing messages.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// List the names of available output devices.
pub fn list_output_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.output_devices();
        (host, devices)
    });
    let _host = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| VoicecastError::Playback {
        message: format!("Failed to enumerate output devices: {}", e),
    })?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only touched by the owning `CpalSource`, which the
/// playback controller drives from one thread at a time.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Output context bound to one CPAL output device.
///
/// Plays decoded buffers at the device's native rate and channel layout,
/// converting in software.
pub struct CpalOutput {
    device: cpal::Device,
    supported_config: SupportedStreamConfig,
}

impl CpalOutput {
    /// Open an output device by name, or the system default when `None`.
    ///
    /// # Errors
    /// Returns `AudioDeviceNotFound` if no matching device exists, or
    /// `Playback` if its configuration cannot be queried.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();
            match device_name {
                Some(name) => {
                    let devices = host.output_devices().map_err(|e| VoicecastError::Playback {
                        message: format!("Failed to enumerate devices: {}", e),
                    })?;
                    devices
                        .into_iter()
                        .find(|d| d.name().is_ok_and(|n| n == name))
                        .ok_or_else(|| VoicecastError::AudioDeviceNotFound {
                            device: name.to_string(),
                        })
                }
                None => host
                    .default_output_device()
                    .ok_or_else(|| VoicecastError::AudioDeviceNotFound {
                        device: "default".to_string(),
                    }),
            }
        })?;

        let supported_config =
            device
                .default_output_config()
                .map_err(|e| VoicecastError::Playback {
                    message: format!("Failed to query default output config: {}", e),
                })?;

        debug!(
            rate = supported_config.sample_rate(),
            channels = supported_config.channels(),
            format = ?supported_config.sample_format(),
            "opened output device"
        );

        Ok(Self {
            device,
            supported_config,
        })
    }

    /// Factory that opens the device on the first play request.
    pub fn factory(device_name: Option<String>) -> ContextFactory {
        Box::new(move || {
            let output = CpalOutput::new(device_name.as_deref())?;
            Ok(Box::new(output) as Box<dyn OutputContext>)
        })
    }
}

impl OutputContext for CpalOutput {
    fn create_source(&mut self, buffer: DecodedAudioBuffer) -> Result<Box<dyn SourceNode>> {
        let native_rate = self.supported_config.sample_rate();
        let native_channels = self.supported_config.channels() as usize;
        let samples = to_device_layout(&buffer, native_rate, native_channels);

        Ok(Box::new(CpalSource {
            device: self.device.clone(),
            config: self.supported_config.clone().into(),
            sample_format: self.supported_config.sample_format(),
            samples: Arc::new(samples),
            stream: None,
        }))
    }
}

struct CpalSource {
    device: cpal::Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    samples: Arc<Vec<f32>>,
    stream: Option<SendableStream>,
}

impl CpalSource {
    fn build_stream<T>(&self, on_ended: Completion) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32> + Default + Send + 'static,
    {
        let samples = Arc::clone(&self.samples);
        let mut position = 0usize;
        let mut on_ended = Some(on_ended);

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let pos = position;
                    let remaining = samples.len().saturating_sub(pos);
                    let to_copy = remaining.min(data.len());

                    for (out, &sample) in data.iter_mut().zip(&samples[pos..pos + to_copy]) {
                        *out = T::from_sample(sample);
                    }
                    data[to_copy..].fill(T::default());
                    position = pos + to_copy;

                    if remaining == 0
                        && let Some(completion) = on_ended.take()
                    {
                        completion.complete();
                    }
                },
                |err| {
                    error!(error = %err, "playback stream error");
                },
                None,
            )
            .map_err(|e| VoicecastError::Playback {
                message: format!("Failed to build output stream: {}", e),
            })
    }
}

impl SourceNode for CpalSource {
    fn start(&mut self, on_ended: Completion) -> Result<()> {
        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(on_ended)?,
            SampleFormat::I16 => self.build_stream::<i16>(on_ended)?,
            SampleFormat::U16 => self.build_stream::<u16>(on_ended)?,
            fmt => {
                return Err(VoicecastError::Playback {
                    message: format!("Unsupported output sample format: {:?}", fmt),
                });
            }
        };

        stream.play().map_err(|e| VoicecastError::Playback {
            message: format!("Failed to start output stream: {}", e),
        })?;
        self.stream = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(SendableStream(stream)) = self.stream.take()
            && let Err(e) = stream.pause()
        {
            warn!(error = %e, "failed to pause output stream");
        }
    }
}

/// Resample every channel to `target_rate` and lay the result out as
/// interleaved frames with `target_channels` channels.
///
/// Extra device channels repeat the last source channel, so mono fans out to
/// every speaker.
fn to_device_layout(
    buffer: &DecodedAudioBuffer,
    target_rate: u32,
    target_channels: usize,
) -> Vec<f32> {
    let planes: Vec<Vec<f32>> = (0..buffer.channel_count())
        .filter_map(|c| buffer.channel(c))
        .map(|plane| resample(plane, buffer.sample_rate(), target_rate))
        .collect();

    let Some(last) = planes.len().checked_sub(1) else {
        return Vec::new();
    };
    let frames = planes[0].len();

    let mut out = Vec::with_capacity(frames * target_channels);
    for i in 0..frames {
        for ch in 0..target_channels {
            out.push(planes[ch.min(last)][i]);
        }
    }
    out
}

/// Simple linear interpolation resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = (source_pos - source_idx as f64) as f32;

            if source_idx + 1 >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let left = samples[source_idx];
                let right = samples[source_idx + 1];
                left + (right - left) * fraction
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pcm::decode_pcm;

    fn buffer(samples: &[i16], rate: u32, channels: u16) -> DecodedAudioBuffer {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        decode_pcm(&bytes, rate, channels).unwrap()
    }

    #[test]
    fn resample_identity_same_rate() {
        let samples = vec![0.1f32, 0.2, 0.3];
        assert_eq!(resample(&samples, 24000, 24000), samples);
    }

    #[test]
    fn resample_upsample_doubles_length_and_interpolates() {
        let resampled = resample(&[0.0, 0.5, 1.0], 24000, 48000);

        assert_eq!(resampled.len(), 6);
        assert_eq!(resampled[0], 0.0);
        assert_eq!(resampled[1], 0.25);
        assert_eq!(resampled[2], 0.5);
    }

    #[test]
    fn resample_24k_to_44k1_length() {
        let resampled = resample(&vec![0.0f32; 24000], 24000, 44100);
        assert!((44099..=44101).contains(&resampled.len()));
    }

    #[test]
    fn resample_empty_input() {
        assert!(resample(&[], 24000, 48000).is_empty());
    }

    #[test]
    fn mono_fans_out_to_stereo() {
        let decoded = buffer(&[16384, -16384], 48000, 1);
        let out = to_device_layout(&decoded, 48000, 2);
        assert_eq!(out, vec![0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn stereo_to_stereo_keeps_channels() {
        let decoded = buffer(&[16384, -16384], 48000, 2);
        let out = to_device_layout(&decoded, 48000, 2);
        assert_eq!(out, vec![0.5, -0.5]);
    }

    #[test]
    fn device_layout_resamples_before_interleaving() {
        let decoded = buffer(&[0, 16384], 24000, 1);
        let out = to_device_layout(&decoded, 48000, 2);
        assert_eq!(out.len(), 4 * 2);
    }

    #[test]
    fn empty_buffer_gives_no_samples() {
        let decoded = buffer(&[], 24000, 1);
        assert!(to_device_layout(&decoded, 48000, 2).is_empty());
    }
}

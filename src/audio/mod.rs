//! Audio payload pipeline.
//!
//! base64 text → [`codec`] → raw PCM bytes → [`pcm`] → [`playback`] → speaker,
//! and independently raw PCM bytes → [`wav`] → downloadable file.

pub mod codec;
#[cfg(feature = "cpal-audio")]
pub mod output;
pub mod pcm;
pub mod playback;
pub mod wav;

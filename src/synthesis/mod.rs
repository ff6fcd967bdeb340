//! Speech synthesis backends.

#[cfg(feature = "remote")]
pub mod gemini;
pub mod provider;
pub mod voice;

//! Command-line interface for voicecast
//!
//! Provides argument parsing using clap derive macros.

use crate::synthesis::voice::Voice;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Text-to-speech narration studio
#[derive(Parser, Debug)]
#[command(name = "voicecast", version, about = "Text-to-speech narration studio")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: info logs, -vv: debug logs)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Audio output device name (default: system default)
    #[arg(long, global = true, value_name = "DEVICE")]
    pub device: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synthesize text, save it to history and play it
    Speak {
        /// Text to speak (read from stdin when omitted)
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,

        /// Voice to use (default: from config)
        #[arg(long, value_name = "VOICE")]
        voice: Option<Voice>,

        /// Only record the clip, do not play it
        #[arg(long)]
        no_play: bool,
    },

    /// List the prebuilt voices
    Voices,

    /// List available audio output devices
    Devices,

    /// List past generations, most recent first
    History,

    /// Play a clip from history
    Play {
        /// Record id (see `voicecast history`)
        id: String,
    },

    /// Write a clip from history as a WAV file
    Export {
        /// Record id (see `voicecast history`)
        id: String,

        /// Directory to write into (default: current directory)
        #[arg(long, short = 'o', value_name = "DIR", default_value = ".")]
        dir: PathBuf,
    },

    /// Delete a clip from history
    Delete {
        /// Record id (see `voicecast history`)
        id: String,
    },

    /// Delete every clip from history
    Clear,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,
    /// Print the effective configuration as TOML
    Show,
}

use anyhow::{Context, Result, bail};
use clap::Parser;
use owo_colors::OwoColorize;
use std::io::{IsTerminal, Read};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use voicecast::audio::output::{CpalOutput, list_output_devices};
use voicecast::cli::{Cli, Commands, ConfigAction};
use voicecast::config::Config;
use voicecast::synthesis::gemini::{GeminiConfig, GeminiSynthesizer};
use voicecast::{FileStore, Studio, Voice};

/// Upper bound on how long `speak`/`play` wait for a clip to finish.
const MAX_PLAYBACK_WAIT: Duration = Duration::from_secs(600);

const PREVIEW_CHARS: usize = 48;

type CliStudio = Studio<FileStore, GeminiSynthesizer>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Speak {
            text,
            voice,
            no_play,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let text = read_text(text)?;
            let voice = voice.unwrap_or(config.synthesis.voice);
            let mut studio = open_studio(&config, cli.device).with_autoplay(!no_play);

            let record = studio.generate(&text, voice).await?;
            if !cli.quiet {
                println!("{} {} ({})", "Saved".green(), record.id.bold(), voice);
            }
            if !no_play {
                studio.wait_until_idle(MAX_PLAYBACK_WAIT);
            }
        }
        Commands::Voices => {
            let config = load_config(cli.config.as_deref())?;
            for voice in Voice::all() {
                let marker = if *voice == config.synthesis.voice {
                    "*"
                } else {
                    " "
                };
                println!("{} {:<8} {}", marker, voice.name(), voice.gender().dimmed());
            }
        }
        Commands::Devices => {
            let devices = list_output_devices()?;
            if devices.is_empty() {
                eprintln!("No audio output devices found");
                std::process::exit(1);
            }
            println!("Available audio output devices:");
            for (idx, device) in devices.iter().enumerate() {
                println!("  [{}] {}", idx, device);
            }
        }
        Commands::History => {
            let config = load_config(cli.config.as_deref())?;
            let studio = open_studio(&config, cli.device);
            if studio.history().is_empty() {
                println!("No generations yet");
            }
            for record in studio.history() {
                println!(
                    "{}  {}  {:<7} {}",
                    record.id.bold(),
                    record.created_at.dimmed(),
                    record.voice.name(),
                    record.preview(PREVIEW_CHARS)
                );
            }
        }
        Commands::Play { id } => {
            let config = load_config(cli.config.as_deref())?;
            let mut studio = open_studio(&config, cli.device);
            studio.play(&id)?;
            studio.wait_until_idle(MAX_PLAYBACK_WAIT);
        }
        Commands::Export { id, dir } => {
            let config = load_config(cli.config.as_deref())?;
            let studio = open_studio(&config, cli.device);
            let path = studio.save_wav(&id, &dir)?;
            if !cli.quiet {
                println!("{} {}", "Wrote".green(), path.display());
            }
        }
        Commands::Delete { id } => {
            let config = load_config(cli.config.as_deref())?;
            let mut studio = open_studio(&config, cli.device);
            if !studio.delete(&id)? {
                eprintln!("No history record with id {}", id);
                std::process::exit(1);
            }
        }
        Commands::Clear => {
            let config = load_config(cli.config.as_deref())?;
            let mut studio = open_studio(&config, cli.device);
            studio.clear_history()?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Path => {
                let path = cli.config.unwrap_or_else(Config::default_path);
                println!("{}", path.display());
            }
            ConfigAction::Show => {
                let mut config = load_config(cli.config.as_deref())?;
                if config.synthesis.api_key.is_some() {
                    config.synthesis.api_key = Some("<redacted>".to_string());
                }
                print!("{}", toml::to_string_pretty(&config)?);
            }
        },
    }

    Ok(())
}

/// Route `tracing` output to stderr.
///
/// `RUST_LOG` wins over the verbosity flags when set.
fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "voicecast=info",
        (false, _) => "voicecast=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/voicecast/config.toml)
/// 3. Built-in defaults with environment variable overrides
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path())?,
    };
    Ok(config.with_env_overrides())
}

fn open_studio(config: &Config, device: Option<String>) -> CliStudio {
    let store = FileStore::new(
        config
            .history
            .dir
            .clone()
            .unwrap_or_else(FileStore::default_dir),
    );
    let gemini = GeminiSynthesizer::new(GeminiConfig {
        api_key: config.synthesis.api_key.clone(),
        model: config.synthesis.model.clone(),
        endpoint: config.synthesis.endpoint.clone(),
    });
    let device = device.or_else(|| config.playback.device.clone());
    Studio::from_config(config, gemini, store, CpalOutput::factory(device))
}

/// Join the words given on the command line, or read all of stdin.
fn read_text(words: Vec<String>) -> Result<String> {
    if !words.is_empty() {
        return Ok(words.join(" "));
    }
    if std::io::stdin().is_terminal() {
        bail!("No text given. Pass it as arguments or pipe it on stdin.");
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read text from stdin")?;
    Ok(text)
}

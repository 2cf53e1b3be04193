use crate::AppError::ConfigError;
use clap::Parser;
use config::Config;
use std::io;
use std::path::PathBuf;
use text2beep::{BeepError, CpalSink, Player, Sheet};

mod config;

fn main() {
    let result = main_result();
    std::process::exit(match result {
        Ok(()) => 0,
        Err(err) => {
            // use Display instead of Debug for user friendly error messages
            log::error!("{err}");
            1
        }
    });
}

pub fn main_result() -> Result<(), AppError> {
    let args = CliArgs::parse();

    // setup logging, quiet wins over verbose
    let default_filter = if args.quiet {
        "off"
    } else if args.verbose {
        "text2beep=debug"
    } else {
        "text2beep=info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if !args.file.exists() {
        return Err(ConfigError(format!("Sheet file not found {:?}", args.file)));
    }

    // read local config
    let local_config = Config::read_config()?;
    if let Some(amplitude) = local_config.amplitude() {
        log::debug!("Configured amplitude {amplitude}");
    }
    let params = local_config.audio_params();

    let mut sheet = Sheet::from_path(&args.file)?;
    if let Some(SubsheetRange { start, end }) = args.range {
        sheet = sheet
            .select_subsheets(start, end)
            .map_err(|err| ConfigError(err.to_string()))?;
    }

    // go!
    log::info!("Playing {}", args.file.display());
    let mut sink = CpalSink::new(params)?;
    let player = Player::new(sheet, params);
    let interrupt = player.interrupt_handle();
    ctrlc::set_handler(move || interrupt.interrupt())
        .map_err(|err| AppError::OtherError(format!("Could not set Ctrl-C handler {err}")))?;
    playback_outcome(player.play(&mut sink))
}

/// Ctrl-C stops playback without being reported as a failure
fn playback_outcome(result: Result<(), BeepError>) -> Result<(), AppError> {
    match result {
        Err(BeepError::Interrupted) => {
            log::info!("Playback interrupted");
            Ok(())
        }
        result => Ok(result?),
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// Disable logging.
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
    /// Log every note and bar.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
    /// Only play subsheets START to END (exclusive) of a sheet with subsheets.
    #[arg(short, long, value_name = "START,END", value_parser = parse_range)]
    range: Option<SubsheetRange>,
    /// Path to the JSON sheet.
    file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsheetRange {
    start: usize,
    end: usize,
}

fn parse_range(input: &str) -> Result<SubsheetRange, String> {
    let (start, end) = input
        .split_once(',')
        .ok_or_else(|| format!("expected START,END but got '{input}'"))?;
    let start = start
        .trim()
        .parse()
        .map_err(|err| format!("invalid range start '{start}': {err}"))?;
    let end = end
        .trim()
        .parse()
        .map_err(|err| format!("invalid range end '{end}': {err}"))?;
    if start >= end {
        return Err(format!("empty range {start},{end}"));
    }
    Ok(SubsheetRange { start, end })
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("sheet error: {0}")]
    SheetError(String),
    #[error("audio error: {0}")]
    AudioError(String),
    #[error("other error: {0}")]
    OtherError(String),
}

impl From<BeepError> for AppError {
    fn from(error: BeepError) -> Self {
        match error {
            BeepError::MalformedNote(_) => Self::SheetError(error.to_string()),
            BeepError::SheetError(s) => Self::SheetError(s),
            BeepError::AudioError(s) => Self::AudioError(s),
            BeepError::IoError(s) => Self::OtherError(s),
            other => Self::OtherError(other.to_string()),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(error: io::Error) -> Self {
        Self::OtherError(error.to_string())
    }
}

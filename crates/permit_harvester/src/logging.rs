//! Logger initialization for the permit-harvester binary.
//!
//! The terminal shows warnings by default; `-v` and `-vv` raise it to info
//! and debug. The optional log file always records at least info.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Destination for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to the terminal (stderr).
    Terminal,
    /// Write to the terminal and to the given file.
    Both(PathBuf),
}

/// Initialize the global logger. A log file that cannot be created is
/// reported and skipped.
pub fn initialize(destination: &LogDestination, verbosity: u8) {
    let config = build_config();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        terminal_level(verbosity),
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if let LogDestination::Both(path) = destination {
        if let Some(file_logger) = create_file_logger(path, file_level(verbosity), config) {
            loggers.push(file_logger);
        }
    }

    let _ = CombinedLogger::init(loggers);
}

fn terminal_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

fn file_level(verbosity: u8) -> LevelFilter {
    terminal_level(verbosity).max(LevelFilter::Info)
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .add_filter_ignore_str("aws_")
        .add_filter_ignore_str("hyper")
        .build()
}

fn create_file_logger(
    path: &Path,
    level: LevelFilter,
    config: Config,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", path, err);
            None
        }
    }
}

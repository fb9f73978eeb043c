//! Logger setup for opwatch.
//!
//! stdout carries the live operation table, so the default destination is a
//! log file and terminal output goes to stderr.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogDestination {
    #[default]
    File,
    Terminal,
    Both,
}

impl LogDestination {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "file" => Some(LogDestination::File),
            "terminal" | "term" => Some(LogDestination::Terminal),
            "both" => Some(LogDestination::Both),
            _ => None,
        }
    }

    fn wants_file(self) -> bool {
        matches!(self, LogDestination::File | LogDestination::Both)
    }

    fn wants_terminal(self) -> bool {
        matches!(self, LogDestination::Terminal | LogDestination::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub destination: LogDestination,
    pub file: PathBuf,
    pub verbose: bool,
}

impl LogSettings {
    fn level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

/// Installs the global logger. Failing to open the log file falls back to
/// stderr logging rather than running silent.
pub fn initialize(settings: &LogSettings) {
    let level = settings.level();
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    if settings.destination.wants_file() {
        match open_log_file(&settings.file) {
            Some(file) => loggers.push(WriteLogger::new(level, build_config(), file)),
            None if !settings.destination.wants_terminal() => {
                loggers.push(terminal_logger(level));
            }
            None => {}
        }
    }
    if settings.destination.wants_terminal() {
        loggers.push(terminal_logger(level));
    }

    let _ = CombinedLogger::init(loggers);
}

fn terminal_logger(level: LevelFilter) -> Box<TermLogger> {
    TermLogger::new(level, build_config(), TerminalMode::Stderr, ColorChoice::Auto)
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn open_log_file(path: &Path) -> Option<File> {
    match File::create(path) {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("Warning: could not create log file {:?}: {}", path, err);
            None
        }
    }
}

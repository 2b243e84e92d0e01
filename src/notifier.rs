//! User-facing progress and diagnostics.
//!
//! [`Notifier`] is the single reporting channel handed to every component, replacing a
//! process-wide quiet flag:
//! - [`Notifier::progress`]: human-readable progress lines on stdout; in
//!   [`VerbosityLevel::Quiet`] they go to the info log instead.
//! - [`Notifier::warn`]/[`Notifier::error`]: always written to stderr (overwrite reports,
//!   missing media, fatal errors).
//! - [`Notifier::debug`]/[`Notifier::trace`]: routed through an `env_logger` logger whose
//!   filter follows the verbosity level (and `RUST_LOG`).
//! - [`Notifier::spinner`]: an `indicatif` spinner on stderr while a blocking external tool
//!   runs; hidden in quiet mode and whenever stderr is not a terminal.

use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerbosityLevel {
    Quiet = 0,  // No progress lines, warnings and errors only
    Normal = 1, // Progress lines
    Info = 2,   // Progress lines plus info logs
    Debug = 3,  // Plus debug logs
    Trace = 4,  // Plus trace logs
}

impl VerbosityLevel {
    /// Maps `--quiet` and the repeated `--verbose` count onto a level.
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return VerbosityLevel::Quiet;
        }
        match verbose {
            0 => VerbosityLevel::Normal,
            1 => VerbosityLevel::Info,
            2 => VerbosityLevel::Debug,
            _ => VerbosityLevel::Trace,
        }
    }

    pub fn to_log_level(self) -> LevelFilter {
        match self {
            VerbosityLevel::Quiet | VerbosityLevel::Normal => LevelFilter::Warn,
            VerbosityLevel::Info => LevelFilter::Info,
            VerbosityLevel::Debug => LevelFilter::Debug,
            VerbosityLevel::Trace => LevelFilter::Trace,
        }
    }
}

pub struct Notifier {
    verbosity: VerbosityLevel,
    logger: env_logger::Logger,
}

impl Notifier {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        let logger = env_logger::Builder::from_env(Env::default())
            .filter_level(verbosity.to_log_level())
            .build();

        Self { verbosity, logger }
    }

    pub fn quiet() -> Self {
        Self::new(VerbosityLevel::Quiet)
    }

    /// Prints `message` on stdout; in quiet mode it only reaches the info log.
    pub fn progress(&self, message: &str) {
        if self.prints_progress() {
            println!("{}", message);
        } else {
            self.log(Level::Info, message);
        }
    }

    /// Whether progress lines go to stdout rather than the log.
    pub fn prints_progress(&self) -> bool {
        self.verbosity != VerbosityLevel::Quiet
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{}", message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}", message);
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn trace(&self, message: &str) {
        self.log(Level::Trace, message);
    }

    /// Starts a steady-ticking spinner, or `None` in quiet mode.
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if self.verbosity == VerbosityLevel::Quiet {
            return None;
        }

        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        Some(spinner)
    }

    pub fn verbosity_level(&self) -> VerbosityLevel {
        self.verbosity
    }

    fn log(&self, level: Level, message: &str) {
        let metadata = Metadata::builder()
            .level(level)
            .target(module_path!())
            .build();
        if self.logger.enabled(&metadata) {
            self.logger.log(
                &Record::builder()
                    .metadata(metadata)
                    .args(format_args!("{}", message))
                    .build(),
            );
        }
    }
}

#![deny(missing_docs)]
//! Shared logging utilities for the progress tracker workspace.
//!
//! This crate provides the `tracker_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every message is
//! prefixed with the poll cycle that was current when it was logged.

use std::sync::atomic::{AtomicU64, Ordering};

/// Number of the poll cycle most recently started by the scheduler.
static POLL_CYCLE: AtomicU64 = AtomicU64::new(0);

/// Records the poll cycle number that subsequent log lines are stamped with.
/// Called by the scheduler once per tick.
pub fn set_poll_cycle(cycle: u64) {
    POLL_CYCLE.store(cycle, Ordering::Relaxed);
}

/// Returns the current poll cycle number, or 0 before the first tick.
pub fn poll_cycle() -> u64 {
    POLL_CYCLE.load(Ordering::Relaxed)
}

/// Logs a trace-level message stamped with the current poll cycle.
#[macro_export]
macro_rules! tracker_trace {
    ($($arg:tt)*) => {{
        log::trace!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message stamped with the current poll cycle.
#[macro_export]
macro_rules! tracker_debug {
    ($($arg:tt)*) => {{
        log::debug!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message stamped with the current poll cycle.
#[macro_export]
macro_rules! tracker_info {
    ($($arg:tt)*) => {{
        log::info!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message stamped with the current poll cycle.
#[macro_export]
macro_rules! tracker_warn {
    ($($arg:tt)*) => {{
        log::warn!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message stamped with the current poll cycle.
#[macro_export]
macro_rules! tracker_error {
    ($($arg:tt)*) => {{
        log::error!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test may already own the global logger.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

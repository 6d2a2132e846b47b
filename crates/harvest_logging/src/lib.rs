#![deny(missing_docs)]
//! Shared logging utilities for the harvester workspace.
//!
//! This crate provides the `harvest_*` logging macros used across the codebase,
//! a per-thread document context that prefixes every message emitted while a
//! document is being processed, and a minimal test initializer for the global
//! logger.

use std::cell::Cell;

#[doc(hidden)]
pub use log as __log;

thread_local! {
    /// Position of the document currently being processed: `(index, total)`, 1-based.
    static DOCUMENT: Cell<Option<(usize, usize)>> = const { Cell::new(None) };
}

/// Sets the document position for the current thread.
/// The orchestrator calls this once per document before working on it.
pub fn set_document_context(index: usize, total: usize) {
    DOCUMENT.with(|v| v.set(Some((index, total))));
}

/// Clears the document position; subsequent messages carry no prefix.
pub fn clear_document_context() {
    DOCUMENT.with(|v| v.set(None));
}

/// Retrieves the document position for the current thread, if any.
pub fn document_context() -> Option<(usize, usize)> {
    DOCUMENT.with(|v| v.get())
}

/// Renders the message prefix for the current document context.
#[doc(hidden)]
pub fn context_prefix() -> String {
    match document_context() {
        Some((index, total)) => format!("[{index}/{total}] "),
        None => String::new(),
    }
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! harvest_debug {
    ($($arg:tt)*) => {{
        $crate::__log::debug!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! harvest_info {
    ($($arg:tt)*) => {{
        $crate::__log::info!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! harvest_warn {
    ($($arg:tt)*) => {{
        $crate::__log::warn!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! harvest_error {
    ($($arg:tt)*) => {{
        $crate::__log::error!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

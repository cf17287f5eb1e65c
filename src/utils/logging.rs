//! Logging macros that respect a per-module `ENABLE_LOGS` switch.
//!
//! A module opts in by declaring the flag and importing the macros from
//! the crate root:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_error};
//!
//! log_info!("{label}: session started");
//! ```
//! Setting the flag to `false` silences that module without touching
//! `RUST_LOG`.

use env_logger::Builder;
use log::LevelFilter;

/// Installs the global logger. Defaults to `info`; `RUST_LOG` overrides.
/// Calling it again is harmless.
pub fn init_logging() {
    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Checks the `ENABLE_LOGS` const of the calling module.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

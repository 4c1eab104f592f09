//! Settings: where databases live, which backend and generator to use, and
//! who is minting.

mod load;
mod schema;

pub use load::{config_path, load, load_or_default, write_settings};
pub use schema::{LoggingSettings, Settings};

use std::path::PathBuf;

use thiserror::Error;

/// Configuration failures abort `open`/`create` before any state mutation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("settings file {path:?} is unreadable: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("settings file {path:?} failed to parse: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("data directory {path:?} cannot be used: {reason}")]
    DataDir { path: PathBuf, reason: String },

    #[error("log file {path:?} is not writable: {reason}")]
    LogUnwritable { path: PathBuf, reason: String },

    #[error("generator `{name}` is not available (only `drand48` reproduces minted sequences)")]
    UnknownGenerator { name: String },
}

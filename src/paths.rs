//! Data-directory resolution.

use std::path::PathBuf;

/// Base directory for minter databases.
///
/// Uses `NOID_DATA_DIR` if set, otherwise `$XDG_DATA_HOME/noid-rs` or
/// `~/.local/share/noid-rs`.
pub(crate) fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("NOID_DATA_DIR")
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }

    std::env::var("XDG_DATA_HOME")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".local")
                .join("share")
        })
        .join("noid-rs")
}

/// Base directory for configuration files.
///
/// Uses `NOID_CONFIG_DIR` if set, otherwise `$XDG_CONFIG_HOME/noid-rs` or
/// `~/.config/noid-rs`.
pub(crate) fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("NOID_CONFIG_DIR")
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }

    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".config")
        })
        .join("noid-rs")
}

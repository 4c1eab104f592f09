use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::{ConfigError, Settings};
use crate::store::Backend;

pub fn config_path() -> PathBuf {
    crate::paths::config_dir().join("settings.toml")
}

/// Load settings from `path` (or the default location), then apply
/// environment overrides. A missing default file yields defaults; a missing
/// explicit file is an error.
pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (config_path(), false),
    };
    let mut settings = if path.exists() {
        let contents = fs::read_to_string(&path).map_err(|e| ConfigError::Unreadable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            reason: e.to_string(),
        })?
    } else if required {
        return Err(ConfigError::Unreadable {
            path,
            reason: "no such file".to_string(),
        });
    } else {
        Settings::default()
    };
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Like [`load`] with the default location, falling back to defaults when
/// the file is broken (the CLI still runs; the problem is logged).
pub fn load_or_default() -> Settings {
    match load(None) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("settings load failed, using defaults: {e}");
            let mut settings = Settings::default();
            apply_env_overrides(&mut settings);
            settings
        }
    }
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(dir) = std::env::var("NOID_DATA_DIR")
        && !dir.trim().is_empty()
    {
        settings.data_dir = Some(PathBuf::from(dir));
    }
    if let Ok(backend) = std::env::var("NOID_BACKEND")
        && let Ok(backend) = Backend::from_str(backend.trim())
    {
        settings.backend = backend;
    }
    if let Ok(contact) = std::env::var("NOID_CONTACT")
        && !contact.trim().is_empty()
    {
        settings.contact = Some(contact.trim().to_string());
    }
}

/// Persist settings, atomically.
pub fn write_settings(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    let unwritable = |reason: String| ConfigError::Unreadable {
        path: path.to_path_buf(),
        reason,
    };
    let dir = path
        .parent()
        .ok_or_else(|| unwritable("path has no parent directory".to_string()))?;
    fs::create_dir_all(dir).map_err(|e| unwritable(e.to_string()))?;
    let contents = toml::to_string_pretty(settings).map_err(|e| unwritable(e.to_string()))?;
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| unwritable(e.to_string()))?;
    temp.write_all(contents.as_bytes())
        .map_err(|e| unwritable(e.to_string()))?;
    temp.persist(path).map_err(|e| unwritable(e.to_string()))?;
    Ok(())
}

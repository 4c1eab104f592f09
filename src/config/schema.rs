use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::rng;
use crate::store::Backend;

/// Minter settings, merged from the TOML file, environment overrides and
/// command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base directory holding database directories. `None` resolves through
    /// `NOID_DATA_DIR` and the XDG data dir.
    pub data_dir: Option<PathBuf>,
    /// Database directory name under `data_dir`.
    pub db_name: String,
    /// Storage backend for new and opened databases.
    pub backend: Backend,
    /// PRNG name; recorded in random-order minters for reproducibility.
    pub generator: String,
    /// Contact recorded in circulation records. `None` falls back to
    /// `$USER`, then `"anonymous"`.
    pub contact: Option<String>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSettings {
    /// Tracing filter, e.g. `noid_rs=debug`. `RUST_LOG` overrides.
    pub filter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: None,
            db_name: "noid".to_string(),
            backend: Backend::default(),
            generator: rng::GENERATOR_NAME.to_string(),
            contact: None,
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    /// Resolved base data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(crate::paths::data_dir)
    }

    /// Resolved database directory (`<data_dir>/<db_name>`).
    pub fn db_dir(&self) -> PathBuf {
        self.data_dir().join(&self.db_name)
    }

    /// Contact string for circulation records.
    pub fn contact(&self) -> String {
        if let Some(contact) = &self.contact
            && !contact.trim().is_empty()
        {
            return contact.trim().to_string();
        }
        std::env::var("USER")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

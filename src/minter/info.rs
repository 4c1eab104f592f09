//! Database inspection (`dbinfo`) and cross-backend import (`dbimport`).

use std::fmt;
use std::str::FromStr;

use super::admin;
use super::session::Minter;
use crate::core::CoreError;
use crate::store::{Backend, OpenMode, open_backend};
use crate::Result;

/// How much of the database `dbinfo` shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbInfoLevel {
    /// Identifying parameters and live counts.
    #[default]
    Brief,
    /// Every admin pair except the sub-counter records.
    Full,
    /// Every key-value pair in the store.
    Dump,
}

impl fmt::Display for DbInfoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DbInfoLevel::Brief => "brief",
            DbInfoLevel::Full => "full",
            DbInfoLevel::Dump => "dump",
        };
        f.write_str(s)
    }
}

impl FromStr for DbInfoLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, CoreError> {
        match s {
            "brief" => Ok(DbInfoLevel::Brief),
            "full" => Ok(DbInfoLevel::Full),
            "dump" => Ok(DbInfoLevel::Dump),
            other => Err(CoreError::bad_input(
                "dbinfo level",
                format!("`{other}` is not one of brief, full, dump"),
            )),
        }
    }
}

/// True for `:/c<i>/value` and `:/c<i>/top` keys.
fn is_subcounter_key(key: &[u8]) -> bool {
    let Some(rest) = key.strip_prefix(b":/c") else {
        return false;
    };
    let Some(slash) = rest.iter().position(|b| *b == b'/') else {
        return false;
    };
    slash > 0 && rest[..slash].iter().all(|b| b.is_ascii_digit())
}

fn display_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('\t', "\\t")
}

impl Minter {
    /// Render database information at the requested level.
    pub fn dbinfo(&self, level: DbInfoLevel) -> Result<String> {
        self.with_session(|session| {
            let mut out = String::new();
            if level == DbInfoLevel::Brief {
                for name in [
                    admin::TEMPLATE,
                    admin::FIRSTPART,
                    admin::GENERATOR_TYPE,
                    admin::GENERATOR_RANDOM,
                    admin::TOTAL,
                    admin::OACOUNTER,
                    admin::HELD,
                    admin::QUEUED,
                    admin::PREGENERATED,
                    admin::LONGTERM,
                    admin::WRAP,
                    admin::ADDCHECKCHAR,
                    admin::PROPERTIES,
                    admin::CREATED,
                ] {
                    let value = session
                        .get_str(&admin::akey(name))?
                        .unwrap_or_default();
                    out.push_str(&format!("{name}: {value}\n"));
                }
                out.push_str(&format!("backend: {}\n", session.backend));
                out.push_str(&format!("database: {}\n", session.dir.display()));
                return Ok(out);
            }

            let prefix: &[u8] = match level {
                DbInfoLevel::Full => admin::ADMIN_PREFIX.as_bytes(),
                _ => b"",
            };
            for (key, value) in session.store.range(prefix, None)? {
                if level == DbInfoLevel::Full && is_subcounter_key(&key) {
                    continue;
                }
                out.push_str(&format!(
                    "{}: {}\n",
                    display_bytes(&key),
                    display_bytes(&value)
                ));
            }
            Ok(out)
        })
    }

    /// Erase this session's store and copy every pair from the named
    /// backend's file in the same database directory. Returns the number
    /// of pairs imported.
    pub fn import_from(&self, source: Backend) -> Result<usize> {
        self.with_session(|session| {
            if source == session.backend {
                return Err(CoreError::bad_input(
                    "dbimport",
                    "source backend is the session's own backend",
                )
                .into());
            }
            let src = open_backend(&session.dir, source, OpenMode::ReadOnly)?;
            let count = src.range(b"", None)?.len();
            session.store.import(src.as_ref())?;
            session.log_event(&format!("imported {count} records from {source} backend"));
            // Creation parameters may have changed wholesale.
            session.admin = admin::AdminState::load(session.store.as_ref())?;
            Ok(count)
        })
    }
}

//! Session lifecycle: open/close, the process-wide registry, persistent
//! connections, the per-session error buffer and the append-only log sink.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use time::OffsetDateTime;
use time::macros::format_description;

use super::admin::{self, AdminState};
use crate::config::{ConfigError, Settings};
use crate::core::CoreError;
use crate::store::{Backend, KvStore, OpenMode, open_backend};
use crate::{Error, Result};

/// UTC `YYYYMMDDHHMMSS`, the stamp format used in circulation records,
/// queue keys and the log.
pub(crate) fn format_stamp(t: OffsetDateTime) -> String {
    let fmt = format_description!("[year][month][day][hour][minute][second]");
    t.format(&fmt).unwrap_or_else(|_| "00000000000000".to_string())
}

pub(crate) fn utc_stamp() -> String {
    format_stamp(OffsetDateTime::now_utc())
}

/// One open database: storage handle, admin cache, log sink, error buffer.
///
/// All state a mutating operation touches lives here, behind the owning
/// [`Minter`]'s mutex.
pub(crate) struct Session {
    pub store: Box<dyn KvStore>,
    pub admin: AdminState,
    pub dir: PathBuf,
    pub backend: Backend,
    pub contact: String,
    pub log: File,
    pub errmsg: Option<String>,
}

impl Session {
    pub fn get_str(&self, key: &[u8]) -> Result<Option<String>> {
        Ok(self
            .store
            .get(key)?
            .map(|v| String::from_utf8_lossy(&v).into_owned()))
    }

    pub fn set_str(&mut self, key: &[u8], value: &str) -> Result<()> {
        self.store.set(key, value.as_bytes())?;
        Ok(())
    }

    /// Read a numeric admin variable, defaulting to 0 when absent.
    pub fn read_u64(&self, name: &str) -> Result<u64> {
        match self.get_str(&admin::akey(name))? {
            Some(v) => v.parse().map_err(|_| {
                CoreError::bad_input(
                    format!("admin variable {name}"),
                    format!("not a number: {v:?}"),
                )
                .into()
            }),
            None => Ok(0),
        }
    }

    pub fn write_u64(&mut self, name: &str, value: u64) -> Result<()> {
        self.set_str(&admin::akey(name), &value.to_string())
    }

    /// Read a numeric value at a raw key, defaulting to 0 when absent.
    pub fn read_u64_key(&self, key: &[u8]) -> Result<u64> {
        match self.get_str(key)? {
            Some(v) => v.parse().map_err(|_| {
                CoreError::bad_input("counter record", format!("not a number: {v:?}")).into()
            }),
            None => Ok(0),
        }
    }

    pub fn bump(&mut self, name: &str, delta: i64) -> Result<u64> {
        let current = self.read_u64(name)? as i64;
        let next = (current + delta).max(0) as u64;
        self.write_u64(name, next)?;
        Ok(next)
    }

    /// Append a line to the database's human-readable `log`.
    pub fn log_event(&mut self, msg: &str) {
        tracing::info!("{msg}");
        let line = format!("{} {msg}\n", utc_stamp());
        if let Err(e) = self.log.write_all(line.as_bytes()) {
            tracing::warn!("log append failed: {e}");
        }
    }

    pub fn record_err(&mut self, err: &Error) {
        self.errmsg = Some(err.to_string());
    }
}

/// A handle on an open minter database.
///
/// Every public operation takes the session mutex for its full duration;
/// a session is single-threaded by design and parallel sessions against
/// the same physical store need external synchronization.
pub struct Minter {
    path: PathBuf,
    settings: Settings,
    pub(crate) inner: Mutex<Session>,
}

static REGISTRY: OnceLock<Mutex<HashMap<PathBuf, Arc<Minter>>>> = OnceLock::new();
static PERSISTENT: AtomicBool = AtomicBool::new(false);

fn registry() -> &'static Mutex<HashMap<PathBuf, Arc<Minter>>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Turn persistent-connection mode on or off. While on, [`Minter::close`]
/// is a no-op and [`Minter::open`] reuses a registered session when the
/// settings and path match.
pub fn set_persistent_connections(on: bool) {
    PERSISTENT.store(on, Ordering::SeqCst);
}

/// Clear the persistent-connection flag and force-close every registered
/// session.
pub fn unpersist() {
    PERSISTENT.store(false, Ordering::SeqCst);
    let handles: Vec<Arc<Minter>> = {
        let mut reg = lock_registry();
        reg.drain().map(|(_, m)| m).collect()
    };
    for minter in handles {
        let mut session = minter.lock();
        if let Err(e) = session.store.close() {
            tracing::warn!("close failed during unpersist: {e}");
        }
    }
}

fn lock_registry() -> MutexGuard<'static, HashMap<PathBuf, Arc<Minter>>> {
    registry()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Track the session for reuse. The registry only serves the
/// persistent-connection feature, so it stays empty while the flag is off.
pub(crate) fn register(minter: &Arc<Minter>) {
    if PERSISTENT.load(Ordering::SeqCst) {
        lock_registry().insert(minter.path.clone(), Arc::clone(minter));
    }
}

impl Minter {
    /// Open an existing database.
    pub fn open(settings: &Settings, mode: OpenMode) -> Result<Arc<Minter>> {
        let dir = settings.db_dir();
        if mode != OpenMode::Create
            && PERSISTENT.load(Ordering::SeqCst)
            && let Ok(canonical) = dir.canonicalize()
        {
            let reg = lock_registry();
            if let Some(existing) = reg.get(&canonical)
                && existing.settings == *settings
            {
                return Ok(Arc::clone(existing));
            }
        }
        let minter = Arc::new(Self::open_fresh(settings, mode)?);
        register(&minter);
        Ok(minter)
    }

    pub(crate) fn open_fresh(settings: &Settings, mode: OpenMode) -> Result<Minter> {
        let dir = settings.db_dir();
        if mode == OpenMode::Create {
            std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir {
                path: dir.clone(),
                reason: e.to_string(),
            })?;
        } else if !dir.is_dir() {
            return Err(ConfigError::DataDir {
                path: dir.clone(),
                reason: "no such database directory".to_string(),
            }
            .into());
        }

        let store = open_backend(&dir, settings.backend, mode)?;
        let admin = AdminState::load(store.as_ref())?;
        let log_path = dir.join("log");
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| ConfigError::LogUnwritable {
                path: log_path,
                reason: e.to_string(),
            })?;

        let path = dir.canonicalize().unwrap_or(dir.clone());
        Ok(Minter {
            path,
            settings: settings.clone(),
            inner: Mutex::new(Session {
                store,
                admin,
                dir,
                backend: settings.backend,
                contact: settings.contact(),
                log,
                errmsg: None,
            }),
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Database directory this session is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the session. A no-op while persistent-connection mode holds a
    /// registration for this path; otherwise the admin cache is dropped and
    /// further use of the store fails.
    pub fn close(&self) -> Result<()> {
        if PERSISTENT.load(Ordering::SeqCst) && lock_registry().contains_key(&self.path) {
            return Ok(());
        }
        lock_registry().remove(&self.path);
        let mut session = self.lock();
        session.admin.raw.clear();
        session.store.close()?;
        Ok(())
    }

    /// Last recoverable failure message, for diagnostic retrieval.
    pub fn errmsg(&self) -> Option<String> {
        self.lock().errmsg.clone()
    }

    /// The session's parsed template, if it generates identifiers.
    pub fn template(&self) -> Option<crate::core::Template> {
        self.lock().admin.template.clone()
    }

    /// Run `f` under the session lock, recording any failure in the
    /// per-session error buffer.
    pub(crate) fn with_session<T>(&self, f: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let mut session = self.lock();
        let result = f(&mut session);
        if let Err(e) = &result {
            session.record_err(e);
        }
        result
    }
}

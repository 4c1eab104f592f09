//! Ordered key-value storage behind the minter.
//!
//! Every layer above speaks one contract: an ordered byte-string map with
//! prefix range scans. Backends differ only in durability mechanics; range
//! order is strict lexicographic byte comparison everywhere, and keys may
//! contain any byte (tabs and slashes included).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

mod memory;
mod redb_store;
mod sqlite;
mod xml;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;
pub use sqlite::SqliteStore;
pub use xml::XmlStore;

use crate::core::CoreError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("i/o error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),
    #[error("store transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),
    #[error("store table error: {0}")]
    RedbTable(#[from] redb::TableError),
    #[error("store read/write error: {0}")]
    RedbStorage(#[from] redb::StorageError),
    #[error("store commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("xml document error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml document malformed: {reason}")]
    XmlMalformed { reason: String },
    #[error("store is closed")]
    Closed,
    #[error("store is read-only, refused {op}")]
    ReadOnly { op: &'static str },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// How a store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Remove any previous store, start empty.
    Create,
    ReadOnly,
    ReadWrite,
}

impl OpenMode {
    pub fn writable(self) -> bool {
        !matches!(self, OpenMode::ReadOnly)
    }
}

/// Uniform ordered key-value map.
///
/// `range` returns pairs whose key starts with `prefix` in ascending key
/// order, honouring `limit` if set. `close` makes subsequent use fail.
pub trait KvStore: Send {
    fn get(&self, k: &[u8]) -> Result<Option<Vec<u8>>>;
    fn set(&mut self, k: &[u8], v: &[u8]) -> Result<()>;
    fn delete(&mut self, k: &[u8]) -> Result<()>;
    fn exists(&self, k: &[u8]) -> Result<bool> {
        Ok(self.get(k)?.is_some())
    }
    fn range(&self, prefix: &[u8], limit: Option<usize>) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
    /// Remove every pair.
    fn clear(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;

    /// Erase self, then copy every pair from `src`.
    fn import(&mut self, src: &dyn KvStore) -> Result<()> {
        self.clear()?;
        for (k, v) in src.range(b"", None)? {
            self.set(&k, &v)?;
        }
        Ok(())
    }
}

/// Which backend implementation a store directory uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Redb,
    Sqlite,
    Xml,
    Memory,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Redb => "redb",
            Backend::Sqlite => "sqlite",
            Backend::Xml => "xml",
            Backend::Memory => "memory",
        }
    }

    /// Backend file name inside the database directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Backend::Redb => "noid.redb",
            Backend::Sqlite => "noid.sqlite",
            Backend::Xml => "noid.xml",
            Backend::Memory => "noid.mem",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, CoreError> {
        match s {
            "redb" => Ok(Backend::Redb),
            "sqlite" => Ok(Backend::Sqlite),
            "xml" => Ok(Backend::Xml),
            "memory" => Ok(Backend::Memory),
            other => Err(CoreError::bad_input(
                "backend",
                format!("unknown backend `{other}` (expected redb, sqlite, xml or memory)"),
            )),
        }
    }
}

/// Open the backend file for a database directory.
pub fn open_backend(dir: &Path, backend: Backend, mode: OpenMode) -> Result<Box<dyn KvStore>> {
    let path = dir.join(backend.file_name());
    Ok(match backend {
        Backend::Redb => Box::new(RedbStore::open(&path, mode)?),
        Backend::Sqlite => Box::new(SqliteStore::open(&path, mode)?),
        Backend::Xml => Box::new(XmlStore::open(&path, mode)?),
        Backend::Memory => Box::new(MemoryStore::new(mode)),
    })
}

/// Exclusive upper bound for a prefix scan: the prefix with its last
/// non-0xFF byte incremented. `None` means scan to the end of the map.
pub(crate) fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while matches!(upper.last(), Some(&0xFF)) {
        upper.pop();
    }
    let last = upper.last_mut()?;
    *last += 1;
    Some(upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_parse_and_display() {
        for b in [Backend::Redb, Backend::Sqlite, Backend::Xml, Backend::Memory] {
            assert_eq!(b.as_str().parse::<Backend>().unwrap(), b);
        }
        assert!("bdb".parse::<Backend>().is_err());
    }

    #[test]
    fn upper_bound_increments_last_byte() {
        assert_eq!(prefix_upper_bound(b"abc"), Some(b"abd".to_vec()));
        assert_eq!(prefix_upper_bound(b"a\xff"), Some(b"b".to_vec()));
        assert_eq!(prefix_upper_bound(b"\xff\xff"), None);
        assert_eq!(prefix_upper_bound(b""), None);
    }
}

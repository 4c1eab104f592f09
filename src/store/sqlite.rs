//! SQL-backed store: one `noid` table keyed by BLOB.
//!
//! SQLite compares BLOBs with memcmp, so `ORDER BY k` gives the
//! lexicographic order the contract requires.

use std::fs;
use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use super::{KvStore, OpenMode, Result, StoreError, prefix_upper_bound};

const BUSY_TIMEOUT_MS: u64 = 5_000;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS noid (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    k  BLOB UNIQUE NOT NULL,
    v  BLOB NOT NULL
)";

pub struct SqliteStore {
    conn: Option<Connection>,
    writable: bool,
}

impl SqliteStore {
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self> {
        if mode == OpenMode::Create && path.exists() {
            fs::remove_file(path).map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let flags = match mode {
            OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
            _ => OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        };
        let conn = Connection::open_with_flags(path, flags)?;
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        if mode.writable() {
            conn.execute_batch(SCHEMA)?;
        }
        Ok(SqliteStore {
            conn: Some(conn),
            writable: mode.writable(),
        })
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(StoreError::Closed)
    }

    fn writable_conn(&self, op: &'static str) -> Result<&Connection> {
        let conn = self.conn()?;
        if self.writable {
            Ok(conn)
        } else {
            Err(StoreError::ReadOnly { op })
        }
    }
}

impl KvStore for SqliteStore {
    fn get(&self, k: &[u8]) -> Result<Option<Vec<u8>>> {
        let v = self
            .conn()?
            .query_row("SELECT v FROM noid WHERE k = ?1", params![k], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(v)
    }

    fn set(&mut self, k: &[u8], v: &[u8]) -> Result<()> {
        self.writable_conn("set")?.execute(
            "INSERT INTO noid (k, v) VALUES (?1, ?2)
             ON CONFLICT (k) DO UPDATE SET v = excluded.v",
            params![k, v],
        )?;
        Ok(())
    }

    fn delete(&mut self, k: &[u8]) -> Result<()> {
        self.writable_conn("delete")?
            .execute("DELETE FROM noid WHERE k = ?1", params![k])?;
        Ok(())
    }

    fn exists(&self, k: &[u8]) -> Result<bool> {
        let hit = self
            .conn()?
            .query_row("SELECT 1 FROM noid WHERE k = ?1", params![k], |_| Ok(()))
            .optional()?;
        Ok(hit.is_some())
    }

    fn range(&self, prefix: &[u8], limit: Option<usize>) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let conn = self.conn()?;
        let cap = limit.map(|n| n as i64).unwrap_or(-1);
        let mut out = Vec::new();
        match prefix_upper_bound(prefix) {
            Some(upper) => {
                let mut stmt = conn.prepare_cached(
                    "SELECT k, v FROM noid WHERE k >= ?1 AND k < ?2 ORDER BY k LIMIT ?3",
                )?;
                let rows = stmt.query_map(params![prefix, upper, cap], |row| {
                    Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?;
                for row in rows {
                    out.push(row?);
                }
            }
            None => {
                let mut stmt = conn
                    .prepare_cached("SELECT k, v FROM noid WHERE k >= ?1 ORDER BY k LIMIT ?2")?;
                let rows = stmt.query_map(params![prefix, cap], |row| {
                    Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?;
                for row in rows {
                    out.push(row?);
                }
            }
        }
        Ok(out)
    }

    fn clear(&mut self) -> Result<()> {
        self.writable_conn("clear")?
            .execute("DELETE FROM noid", [])?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.conn = None;
        Ok(())
    }
}

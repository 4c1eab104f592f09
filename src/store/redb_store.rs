//! Default backend: a memory-mapped ordered KV file via redb.
//!
//! redb keys are compared bytewise, which matches the contract's strict
//! lexicographic order. Each mutation commits its own transaction; the
//! minter serializes operations above this layer, so there is no write
//! contention to batch around.

use std::fs;
use std::path::Path;

use redb::{Database, TableDefinition};

use super::{KvStore, OpenMode, Result, StoreError, prefix_upper_bound};

const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("noid");

pub struct RedbStore {
    db: Option<Database>,
    writable: bool,
}

impl RedbStore {
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self> {
        if mode == OpenMode::Create && path.exists() {
            fs::remove_file(path).map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let db = match mode {
            OpenMode::Create => {
                let db = Database::create(path)?;
                // Materialize the table so read transactions see it.
                let txn = db.begin_write()?;
                txn.open_table(TABLE)?;
                txn.commit()?;
                db
            }
            OpenMode::ReadOnly | OpenMode::ReadWrite => Database::open(path)?,
        };
        Ok(RedbStore {
            db: Some(db),
            writable: mode.writable(),
        })
    }

    fn db(&self) -> Result<&Database> {
        self.db.as_ref().ok_or(StoreError::Closed)
    }

    fn writable_db(&self, op: &'static str) -> Result<&Database> {
        let db = self.db()?;
        if self.writable {
            Ok(db)
        } else {
            Err(StoreError::ReadOnly { op })
        }
    }
}

impl KvStore for RedbStore {
    fn get(&self, k: &[u8]) -> Result<Option<Vec<u8>>> {
        let txn = self.db()?.begin_read()?;
        let table = txn.open_table(TABLE)?;
        Ok(table.get(k)?.map(|guard| guard.value().to_vec()))
    }

    fn set(&mut self, k: &[u8], v: &[u8]) -> Result<()> {
        let txn = self.writable_db("set")?.begin_write()?;
        {
            let mut table = txn.open_table(TABLE)?;
            table.insert(k, v)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn delete(&mut self, k: &[u8]) -> Result<()> {
        let txn = self.writable_db("delete")?.begin_write()?;
        {
            let mut table = txn.open_table(TABLE)?;
            table.remove(k)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn range(&self, prefix: &[u8], limit: Option<usize>) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let txn = self.db()?.begin_read()?;
        let table = txn.open_table(TABLE)?;
        let iter = match prefix_upper_bound(prefix) {
            Some(upper) => table.range(prefix..upper.as_slice())?,
            None => table.range(prefix..)?,
        };
        let cap = limit.unwrap_or(usize::MAX);
        let mut out = Vec::new();
        for pair in iter {
            if out.len() >= cap {
                break;
            }
            let (k, v) = pair?;
            out.push((k.value().to_vec(), v.value().to_vec()));
        }
        Ok(out)
    }

    fn clear(&mut self) -> Result<()> {
        let txn = self.writable_db("clear")?.begin_write()?;
        txn.delete_table(TABLE)?;
        txn.open_table(TABLE)?;
        txn.commit()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.db = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> (tempfile::TempDir, RedbStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(&dir.path().join("noid.redb"), OpenMode::Create).unwrap();
        (dir, store)
    }

    #[test]
    fn set_get_delete() {
        let (_dir, mut s) = scratch();
        s.set(b"k", b"v").unwrap();
        assert_eq!(s.get(b"k").unwrap().unwrap(), b"v");
        s.set(b"k", b"v2").unwrap();
        assert_eq!(s.get(b"k").unwrap().unwrap(), b"v2");
        s.delete(b"k").unwrap();
        s.delete(b"k").unwrap(); // idempotent
        assert!(s.get(b"k").unwrap().is_none());
    }

    #[test]
    fn range_honours_prefix_order_and_limit() {
        let (_dir, mut s) = scratch();
        for k in [&b":/q/b"[..], b":/q/a", b":/p/1", b"zz"] {
            s.set(k, b"x").unwrap();
        }
        let q = s.range(b":/q/", None).unwrap();
        assert_eq!(
            q.iter().map(|(k, _)| k.as_slice()).collect::<Vec<_>>(),
            vec![&b":/q/a"[..], b":/q/b"]
        );
        assert_eq!(s.range(b":/", Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn keys_with_tabs_and_high_bytes() {
        let (_dir, mut s) = scratch();
        let key = b"id99\t:/c";
        s.set(key, b"i|d|c|1").unwrap();
        assert!(s.exists(key).unwrap());
        let long_key = vec![0xABu8; 511];
        s.set(&long_key, b"big").unwrap();
        assert_eq!(s.get(&long_key).unwrap().unwrap(), b"big");
    }

    #[test]
    fn create_truncates_previous_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noid.redb");
        let mut s = RedbStore::open(&path, OpenMode::Create).unwrap();
        s.set(b"gone", b"1").unwrap();
        s.close().unwrap();
        let s = RedbStore::open(&path, OpenMode::Create).unwrap();
        assert!(s.get(b"gone").unwrap().is_none());
    }

    #[test]
    fn reopen_sees_committed_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noid.redb");
        let mut s = RedbStore::open(&path, OpenMode::Create).unwrap();
        s.set(b"persist", b"yes").unwrap();
        s.close().unwrap();
        let s = RedbStore::open(&path, OpenMode::ReadWrite).unwrap();
        assert_eq!(s.get(b"persist").unwrap().unwrap(), b"yes");
    }
}

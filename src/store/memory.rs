//! In-memory ordered map backend.
//!
//! Used directly in tests and as the working set of the XML backend; a
//! `BTreeMap` gives the lexicographic order the contract requires for free.

use std::collections::BTreeMap;

use super::{KvStore, OpenMode, Result, StoreError};

#[derive(Debug)]
pub struct MemoryStore {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
    writable: bool,
    closed: bool,
}

impl MemoryStore {
    pub fn new(mode: OpenMode) -> Self {
        MemoryStore {
            map: BTreeMap::new(),
            writable: mode.writable(),
            closed: false,
        }
    }

    pub(crate) fn map(&self) -> &BTreeMap<Vec<u8>, Vec<u8>> {
        &self.map
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn check_writable(&self, op: &'static str) -> Result<()> {
        self.check_open()?;
        if self.writable {
            Ok(())
        } else {
            Err(StoreError::ReadOnly { op })
        }
    }
}

impl KvStore for MemoryStore {
    fn get(&self, k: &[u8]) -> Result<Option<Vec<u8>>> {
        self.check_open()?;
        Ok(self.map.get(k).cloned())
    }

    fn set(&mut self, k: &[u8], v: &[u8]) -> Result<()> {
        self.check_writable("set")?;
        self.map.insert(k.to_vec(), v.to_vec());
        Ok(())
    }

    fn delete(&mut self, k: &[u8]) -> Result<()> {
        self.check_writable("delete")?;
        self.map.remove(k);
        Ok(())
    }

    fn exists(&self, k: &[u8]) -> Result<bool> {
        self.check_open()?;
        Ok(self.map.contains_key(k))
    }

    fn range(&self, prefix: &[u8], limit: Option<usize>) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.check_open()?;
        let cap = limit.unwrap_or(usize::MAX);
        Ok(self
            .map
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .take(cap)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn clear(&mut self) -> Result<()> {
        self.check_writable("clear")?;
        self.map.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

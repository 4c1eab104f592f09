//! XML document backend.
//!
//! The whole map is held in memory and serialized to `noid.xml` on every
//! mutation (stores are small; the minter serializes writes above this
//! layer). Keys and values are percent-encoded down to an XML-inert ASCII
//! subset before entering the document, so the file stays well-formed while
//! the contract keeps accepting any byte, tabs included.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;

use super::memory::MemoryStore;
use super::{KvStore, OpenMode, Result, StoreError};

pub struct XmlStore {
    path: PathBuf,
    inner: MemoryStore,
    writable: bool,
    closed: bool,
}

/// Bytes written literally; everything else becomes `%XX`. The exclusions
/// cover the XML metacharacters and `%` itself.
fn is_plain(b: u8) -> bool {
    (0x21..=0x7E).contains(&b) && !matches!(b, b'%' | b'&' | b'<' | b'>' | b'"' | b'\'')
}

fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if is_plain(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn decode(text: &str) -> std::result::Result<Vec<u8>, String> {
    let raw = text.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let hex = raw
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| format!("truncated percent escape at byte {i}"))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    Ok(out)
}

fn entry_key(e: &quick_xml::events::BytesStart<'_>) -> Result<Vec<u8>> {
    let attr = e
        .try_get_attribute("k")
        .map_err(quick_xml::Error::from)?
        .ok_or_else(|| StoreError::XmlMalformed {
            reason: "entry without k attribute".into(),
        })?;
    decode(&String::from_utf8_lossy(&attr.value))
        .map_err(|reason| StoreError::XmlMalformed { reason })
}

impl XmlStore {
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self> {
        let mut store = XmlStore {
            path: path.to_path_buf(),
            inner: MemoryStore::new(OpenMode::ReadWrite),
            writable: mode.writable(),
            closed: false,
        };
        match mode {
            OpenMode::Create => {
                store.flush()?;
            }
            OpenMode::ReadOnly | OpenMode::ReadWrite => {
                store.load()?;
            }
        }
        Ok(store)
    }

    fn load(&mut self) -> Result<()> {
        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mut reader = Reader::from_str(&content);
        let mut pending_key: Option<Vec<u8>> = None;
        let mut pending_val: Vec<u8> = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Start(e) if e.name().as_ref() == b"entry" => {
                    pending_key = Some(entry_key(&e)?);
                    pending_val.clear();
                }
                Event::Empty(e) if e.name().as_ref() == b"entry" => {
                    let key = entry_key(&e)?;
                    self.inner.set(&key, b"")?;
                }
                Event::Text(t) => {
                    if pending_key.is_some() {
                        pending_val.extend_from_slice(&t.into_inner());
                    }
                }
                Event::End(e) if e.name().as_ref() == b"entry" => {
                    if let Some(key) = pending_key.take() {
                        let val = decode(&String::from_utf8_lossy(&pending_val))
                            .map_err(|reason| StoreError::XmlMalformed { reason })?;
                        self.inner.set(&key, &val)?;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(())
    }

    /// Serialize the working set and atomically replace the document.
    fn flush(&self) -> Result<()> {
        let mut doc = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<noid>\n");
        for (k, v) in self.inner.map() {
            doc.push_str("  <entry k=\"");
            doc.push_str(&encode(k));
            doc.push_str("\">");
            doc.push_str(&encode(v));
            doc.push_str("</entry>\n");
        }
        doc.push_str("</noid>\n");

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        temp.write_all(doc.as_bytes()).map_err(io_err)?;
        temp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
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

impl KvStore for XmlStore {
    fn get(&self, k: &[u8]) -> Result<Option<Vec<u8>>> {
        self.check_open()?;
        self.inner.get(k)
    }

    fn set(&mut self, k: &[u8], v: &[u8]) -> Result<()> {
        self.check_writable("set")?;
        self.inner.set(k, v)?;
        self.flush()
    }

    fn delete(&mut self, k: &[u8]) -> Result<()> {
        self.check_writable("delete")?;
        self.inner.delete(k)?;
        self.flush()
    }

    fn exists(&self, k: &[u8]) -> Result<bool> {
        self.check_open()?;
        self.inner.exists(k)
    }

    fn range(&self, prefix: &[u8], limit: Option<usize>) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.check_open()?;
        self.inner.range(prefix, limit)
    }

    fn clear(&mut self) -> Result<()> {
        self.check_writable("clear")?;
        self.inner.clear()?;
        self.flush()
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

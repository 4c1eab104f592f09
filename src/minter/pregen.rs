//! Pre-generation pool: ready-to-issue identifiers for latency-sensitive
//! callers.
//!
//! A FIFO of already-computed identifiers under `:/p/<index>`, bounded by
//! the `pregen_head`/`pregen_tail` cursors. Slots are written at the tail
//! by `pregenerate` and consumed at the head by mint's fast path.

use super::admin;
use super::mint::{check_batch, generate_cleared};
use super::session::{Minter, Session, utc_stamp};
use crate::core::{Circulation, Status};
use crate::minter::OpError;
use crate::{Error, Result};

impl Minter {
    /// Generate up to `count` identifiers (1..=10 000) into the pool,
    /// recording them as pre-generated rather than issued. Stops early on
    /// exhaustion; returns the pooled ids.
    pub fn pregenerate(&self, count: usize) -> Result<Vec<String>> {
        self.with_session(|session| {
            check_batch("pregenerate", count)?;
            if session.admin.template.is_none() {
                return Err(OpError::BindOnly.into());
            }
            let mut out = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                match pregenerate_one(session) {
                    Ok(id) => out.push(id),
                    Err(Error::Op(OpError::Exhausted { .. })) if !out.is_empty() => break,
                    Err(e) => return Err(e),
                }
            }
            Ok(out)
        })
    }

    /// Number of identifiers waiting in the pool.
    pub fn pregen_count(&self) -> Result<u64> {
        self.with_session(|s| s.read_u64(admin::PREGENERATED))
    }
}

fn pregenerate_one(session: &mut Session) -> Result<String> {
    let id = generate_cleared(session)?;
    let now = utc_stamp();
    let oacounter = session.read_u64(admin::OACOUNTER)?;
    let contact = session.contact.clone();
    let circ = match session.get_str(&admin::circ_key(&id))? {
        Some(raw) => {
            let mut circ = Circulation::parse(&raw)?;
            circ.push(Status::Pregenerated, now, contact, oacounter);
            circ
        }
        None => Circulation::new(Status::Pregenerated, now, contact, oacounter),
    };
    session.set_str(&admin::circ_key(&id), &circ.to_string())?;

    let tail = session.read_u64(admin::PREGEN_TAIL)?.max(1);
    session.store.set(&admin::pool_key(tail), id.as_bytes())?;
    session.write_u64(admin::PREGEN_TAIL, tail + 1)?;
    session.bump(admin::PREGENERATED, 1)?;
    Ok(id)
}

/// Mint's fast path: pop the head slot and issue it. `None` when the pool
/// is empty (or every remaining slot had to be skipped).
pub(crate) fn pop(session: &mut Session) -> Result<Option<String>> {
    loop {
        let head = session.read_u64(admin::PREGEN_HEAD)?.max(1);
        let tail = session.read_u64(admin::PREGEN_TAIL)?.max(1);
        if head >= tail {
            return Ok(None);
        }
        let key = admin::pool_key(head);
        let slot = session.store.get(&key)?;
        session.store.delete(&key)?;
        session.write_u64(admin::PREGEN_HEAD, head + 1)?;
        let Some(value) = slot else {
            continue;
        };
        session.bump(admin::PREGENERATED, -1)?;
        let id = String::from_utf8_lossy(&value).into_owned();

        // A hold placed after pre-generation wins; the slot is dropped.
        if session.store.exists(&admin::hold_key(&id))? {
            session.log_event(&format!(
                "note: dropping held identifier {id} from the pre-generation pool"
            ));
            continue;
        }

        issue_from_pool(session, &id)?;
        return Ok(Some(id));
    }
}

/// Rewrite the leading SVEC byte `p` to `i` and refresh the record to the
/// moment of issue.
fn issue_from_pool(session: &mut Session, id: &str) -> Result<()> {
    let now = utc_stamp();
    let oacounter = session.read_u64(admin::OACOUNTER)?;
    let contact = session.contact.clone();
    let circ = match session.get_str(&admin::circ_key(id))? {
        Some(raw) => {
            let mut circ = Circulation::parse(&raw)?;
            if circ.status() == Some(Status::Pregenerated) {
                circ.relabel(Status::Issued, now, contact, oacounter);
            } else {
                session.log_event(&format!(
                    "error: pool slot for {id} found circulation state {:?}",
                    circ.svec
                ));
                circ.push(Status::Issued, now, contact, oacounter);
            }
            circ
        }
        None => Circulation::new(Status::Issued, now, contact, oacounter),
    };
    session.set_str(&admin::circ_key(id), &circ.to_string())?;
    if session.admin.longterm && !session.store.exists(&admin::hold_key(id))? {
        session.store.set(&admin::hold_key(id), b"1")?;
        session.bump(admin::HELD, 1)?;
    }
    Ok(())
}

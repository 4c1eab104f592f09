//! The recycling queue and per-identifier holds.
//!
//! Queue entries live under `:/q/<qdate>/<seqnum>/<paddedid>` so a plain
//! byte-ordered scan yields ripeness order: the all-zero reserved lane
//! first, then real dates ascending, then sequence numbers, then padded
//! identifier value.

use std::fmt;
use std::str::FromStr;

use time::{Duration, OffsetDateTime};

use super::admin;
use super::session::{Minter, Session, format_stamp, utc_stamp};
use crate::core::{Circulation, CoreError, Status};
use crate::minter::OpError;
use crate::Result;

/// The all-zero `qdate` of the reserved (`first`/`lvf`) lane.
pub const ZERO_QDATE: &str = "00000000000000";

/// When a queued identifier becomes mintable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueWhen {
    Now,
    Seconds(u64),
    Days(u64),
    /// Reserved lane, first-queued-first-out.
    First,
    /// Reserved lane, lowest identifier value first.
    Lvf,
    /// Remove a prior queue entry.
    Delete,
}

impl fmt::Display for QueueWhen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueWhen::Now => write!(f, "now"),
            QueueWhen::Seconds(n) => write!(f, "{n}s"),
            QueueWhen::Days(n) => write!(f, "{n}d"),
            QueueWhen::First => write!(f, "first"),
            QueueWhen::Lvf => write!(f, "lvf"),
            QueueWhen::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for QueueWhen {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, CoreError> {
        match s {
            "now" => return Ok(QueueWhen::Now),
            "first" => return Ok(QueueWhen::First),
            "lvf" => return Ok(QueueWhen::Lvf),
            "delete" => return Ok(QueueWhen::Delete),
            _ => {}
        }
        if let Some(n) = s.strip_suffix('s')
            && let Ok(n) = n.parse()
        {
            return Ok(QueueWhen::Seconds(n));
        }
        if let Some(n) = s.strip_suffix('d')
            && let Ok(n) = n.parse()
        {
            return Ok(QueueWhen::Days(n));
        }
        Err(CoreError::bad_input(
            "queue mode",
            format!("`{s}` is not one of now, first, lvf, delete, <N>s, <N>d"),
        ))
    }
}

impl Minter {
    /// Queue (or with [`QueueWhen::Delete`] unqueue) identifiers for
    /// (re-)issue. Returns the ids acted on, in input order.
    pub fn queue(&self, when: QueueWhen, ids: &[String]) -> Result<Vec<String>> {
        self.with_session(|session| {
            let mut done = Vec::with_capacity(ids.len());
            for id in ids {
                if id.is_empty() {
                    return Err(CoreError::bad_input("identifier", "must not be empty").into());
                }
                match when {
                    QueueWhen::Delete => unqueue_one(session, id)?,
                    _ => enqueue_one(session, when, id)?,
                }
                done.push(id.clone());
            }
            Ok(done)
        })
    }

    /// Place a hold on each identifier.
    pub fn hold_set(&self, ids: &[String]) -> Result<Vec<String>> {
        self.with_session(|session| {
            let mut done = Vec::with_capacity(ids.len());
            for id in ids {
                hold_set_one(session, id)?;
                done.push(id.clone());
            }
            Ok(done)
        })
    }

    /// Release the hold on each identifier.
    pub fn hold_release(&self, ids: &[String]) -> Result<Vec<String>> {
        self.with_session(|session| {
            let mut done = Vec::with_capacity(ids.len());
            for id in ids {
                hold_release_one(session, id)?;
                done.push(id.clone());
            }
            Ok(done)
        })
    }

    /// Number of identifiers currently held.
    pub fn held_count(&self) -> Result<u64> {
        self.with_session(|s| s.read_u64(admin::HELD))
    }

    /// Number of identifiers currently queued.
    pub fn queued_count(&self) -> Result<u64> {
        self.with_session(|s| s.read_u64(admin::QUEUED))
    }
}

fn enqueue_one(session: &mut Session, when: QueueWhen, id: &str) -> Result<()> {
    if session.admin.genonly
        && let Some(template) = session.admin.template.clone()
    {
        template.matches(id, &session.admin.firstpart)?;
    }
    if session.store.exists(&admin::hold_key(id))? {
        return Err(OpError::HeldCannotQueue { id: id.to_string() }.into());
    }

    let qdate = match when {
        QueueWhen::Now => utc_stamp(),
        QueueWhen::Seconds(n) => format_stamp(OffsetDateTime::now_utc() + Duration::seconds(n as i64)),
        QueueWhen::Days(n) => format_stamp(OffsetDateTime::now_utc() + Duration::days(n as i64)),
        QueueWhen::First | QueueWhen::Lvf => ZERO_QDATE.to_string(),
        // Dispatched to unqueue_one by the caller; refuse rather than assert.
        QueueWhen::Delete => {
            return Err(CoreError::bad_input("queue mode", "delete does not enqueue").into());
        }
    };
    let seqnum = match when {
        QueueWhen::Lvf => 0,
        QueueWhen::First => {
            let n = session.read_u64(admin::FSEQNUM)?.max(1);
            session.write_u64(admin::FSEQNUM, n + 1)?;
            n
        }
        _ => {
            let stored_date = session
                .get_str(&admin::akey(admin::GSEQNUM_DATE))?
                .unwrap_or_default();
            let mut n = session.read_u64(admin::GSEQNUM)?.max(1);
            if stored_date != qdate {
                n = 1;
                session.set_str(&admin::akey(admin::GSEQNUM_DATE), &qdate)?;
            }
            session.write_u64(admin::GSEQNUM, n + 1)?;
            n
        }
    };

    let padded = session.admin.pad_id(id);
    session
        .store
        .set(&admin::queue_key(&qdate, seqnum, &padded), id.as_bytes())?;
    session.bump(admin::QUEUED, 1)?;
    transition(session, id, Status::Queued)?;
    Ok(())
}

fn unqueue_one(session: &mut Session, id: &str) -> Result<()> {
    let mut removed = 0;
    for (key, value) in session.store.range(&admin::queue_prefix(), None)? {
        if value == id.as_bytes() {
            session.store.delete(&key)?;
            removed += 1;
        }
    }
    if removed == 0 {
        return Err(OpError::conflict(id, "cannot unqueue; no queue entry found").into());
    }
    session.bump(admin::QUEUED, -removed)?;
    transition(session, id, Status::Unqueued)?;
    Ok(())
}

/// Prepend a status letter to the id's circulation record, creating the
/// record when the id has no history yet.
fn transition(session: &mut Session, id: &str, status: Status) -> Result<()> {
    let now = utc_stamp();
    let oacounter = session.read_u64(admin::OACOUNTER)?;
    let contact = session.contact.clone();
    let circ = match session.get_str(&admin::circ_key(id))? {
        Some(raw) => {
            let mut circ = Circulation::parse(&raw)?;
            circ.push(status, now, contact, oacounter);
            circ
        }
        None => Circulation::new(status, now, contact, oacounter),
    };
    session.set_str(&admin::circ_key(id), &circ.to_string())
}

fn hold_set_one(session: &mut Session, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(CoreError::bad_input("identifier", "must not be empty").into());
    }
    if session.store.exists(&admin::hold_key(id))? {
        return Err(OpError::conflict(id, "hold already set").into());
    }
    let held = session.read_u64(admin::HELD)?;
    if session.admin.oatop != crate::core::NOLIMIT && held + 1 > session.admin.oatop as u64 {
        return Err(OpError::conflict(id, "hold count would exceed capacity").into());
    }
    session.store.set(&admin::hold_key(id), b"1")?;
    session.bump(admin::HELD, 1)?;
    Ok(())
}

fn hold_release_one(session: &mut Session, id: &str) -> Result<()> {
    if !session.store.exists(&admin::hold_key(id))? {
        return Err(OpError::conflict(id, "no hold to release").into());
    }
    session.store.delete(&admin::hold_key(id))?;
    session.bump(admin::HELD, -1)?;
    Ok(())
}

/// One parsed queue key.
struct QueueEntry {
    key: Vec<u8>,
    qdate: String,
    id: String,
}

fn head_entry(session: &Session) -> Result<Option<QueueEntry>> {
    let head = session.store.range(&admin::queue_prefix(), Some(1))?;
    let Some((key, value)) = head.into_iter().next() else {
        return Ok(None);
    };
    let text = String::from_utf8_lossy(&key).into_owned();
    let rest = text
        .strip_prefix(":/q/")
        .ok_or_else(|| CoreError::bad_input("queue key", format!("malformed key {text:?}")))?;
    let qdate = rest
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string();
    Ok(Some(QueueEntry {
        key,
        qdate,
        id: String::from_utf8_lossy(&value).into_owned(),
    }))
}

/// Pop the first ripe, valid queue entry, skipping (with a log line) stale
/// ones. `None` when the queue is empty or its head is not yet ripe.
pub(crate) fn consume_ripe(session: &mut Session) -> Result<Option<String>> {
    let now = utc_stamp();
    loop {
        let Some(entry) = head_entry(session)? else {
            return Ok(None);
        };
        if entry.qdate != ZERO_QDATE && entry.qdate.as_str() > now.as_str() {
            // Dates ascend through the scan, so nothing further is ripe.
            return Ok(None);
        }

        session.store.delete(&entry.key)?;
        let remaining = session.bump(admin::QUEUED, -1)?;
        if remaining == 0 {
            // Queue drained: reset the reserved-lane sequence.
            session.write_u64(admin::FSEQNUM, 1)?;
        }
        let id = entry.id;

        if session.store.exists(&admin::hold_key(id.as_str()))? {
            session.log_event(&format!("note: dropping held identifier {id} from queue"));
            continue;
        }
        let Some(raw) = session.get_str(&admin::circ_key(&id))? else {
            session.log_event(&format!(
                "error: queued identifier {id} has no circulation record; skipping"
            ));
            continue;
        };
        let circ = Circulation::parse(&raw)?;
        match circ.status() {
            Some(Status::Queued) => {
                if circ.svec == "q" {
                    session.log_event(&format!("note: {id} is being pre-cycled"));
                }
                return Ok(Some(id));
            }
            Some(Status::Issued) => {
                session.log_event(&format!(
                    "error: queued identifier {id} was already issued; skipping"
                ));
            }
            Some(Status::Unqueued) => {
                session.log_event(&format!(
                    "note: queued identifier {id} was unqueued; skipping"
                ));
            }
            _ => {
                session.log_event(&format!(
                    "error: queued identifier {id} has unexpected circulation state {:?}; skipping",
                    circ.svec
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_parse() {
        assert_eq!("now".parse::<QueueWhen>().unwrap(), QueueWhen::Now);
        assert_eq!("600s".parse::<QueueWhen>().unwrap(), QueueWhen::Seconds(600));
        assert_eq!("30d".parse::<QueueWhen>().unwrap(), QueueWhen::Days(30));
        assert_eq!("first".parse::<QueueWhen>().unwrap(), QueueWhen::First);
        assert_eq!("lvf".parse::<QueueWhen>().unwrap(), QueueWhen::Lvf);
        assert_eq!("delete".parse::<QueueWhen>().unwrap(), QueueWhen::Delete);
        assert!("tomorrow".parse::<QueueWhen>().is_err());
        assert!("s".parse::<QueueWhen>().is_err());
    }

    #[test]
    fn when_display_roundtrips() {
        for s in ["now", "45s", "7d", "first", "lvf", "delete"] {
            assert_eq!(s.parse::<QueueWhen>().unwrap().to_string(), s);
        }
    }
}

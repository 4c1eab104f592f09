//! Circulation records: the per-identifier `SVEC|date|contact|counter` value.
//!
//! The status vector grows leftward; its first character is the current
//! status and the rest is history. Only four letters circulate.

use std::fmt;

use super::error::CoreError;

/// One circulation status letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `i`: issued.
    Issued,
    /// `q`: queued for (re-)issue.
    Queued,
    /// `u`: unqueued (a queue entry was deleted).
    Unqueued,
    /// `p`: pre-generated, waiting in the pool.
    Pregenerated,
}

impl Status {
    pub fn letter(self) -> char {
        match self {
            Status::Issued => 'i',
            Status::Queued => 'q',
            Status::Unqueued => 'u',
            Status::Pregenerated => 'p',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'i' => Some(Status::Issued),
            'q' => Some(Status::Queued),
            'u' => Some(Status::Unqueued),
            'p' => Some(Status::Pregenerated),
            _ => None,
        }
    }
}

/// Parsed form of the `<id>\t:/c` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circulation {
    /// Status vector, current status leftmost. Non-empty.
    pub svec: String,
    /// UTC stamp `YYYYMMDDHHMMSS` of the last transition.
    pub date: String,
    /// Who performed it.
    pub contact: String,
    /// Overall mint counter at the time.
    pub counter: u64,
}

impl Circulation {
    pub fn new(status: Status, date: String, contact: String, counter: u64) -> Self {
        Circulation {
            svec: status.letter().to_string(),
            date,
            contact,
            counter,
        }
    }

    /// Current status, if the leading letter is a known one.
    pub fn status(&self) -> Option<Status> {
        self.svec.chars().next().and_then(Status::from_letter)
    }

    /// Push a new current status onto the front of the vector.
    pub fn push(&mut self, status: Status, date: String, contact: String, counter: u64) {
        self.svec.insert(0, status.letter());
        self.date = date;
        self.contact = contact;
        self.counter = counter;
    }

    /// Replace the current status letter in place (pool issue rewrites
    /// `p` to `i` rather than extending history).
    pub fn relabel(&mut self, status: Status, date: String, contact: String, counter: u64) {
        self.svec.replace_range(0..1, &status.letter().to_string());
        self.date = date;
        self.contact = contact;
        self.counter = counter;
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let mut parts = raw.splitn(4, '|');
        let (Some(svec), Some(date), Some(contact), Some(counter)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CoreError::bad_input(
                "circulation record",
                format!("expected 4 `|`-separated fields in {raw:?}"),
            ));
        };
        if svec.is_empty() {
            return Err(CoreError::bad_input(
                "circulation record",
                "empty status vector",
            ));
        }
        let counter = counter.parse().map_err(|_| {
            CoreError::bad_input(
                "circulation record",
                format!("bad counter field {counter:?}"),
            )
        })?;
        Ok(Circulation {
            svec: svec.to_string(),
            date: date.to_string(),
            contact: contact.to_string(),
            counter,
        })
    }
}

impl fmt::Display for Circulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.svec, self.date, self.contact, self.counter
        )
    }
}

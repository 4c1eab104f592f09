//! The single authoritative mint algorithm.
//!
//! Three paths, tried in order under the session lock: the pre-generation
//! pool, the recycling queue, then the generator. The generator loops until
//! a candidate clears the per-id guards or the space is exhausted.

use super::admin;
use super::pregen;
use super::queue;
use super::session::{Minter, Session, utc_stamp};
use crate::core::limits::MAX_BATCH;
use crate::core::{
    Circulation, CoreError, GenMode, Lcg48, NOLIMIT, Status, append_checkchar, n2xdig,
};
use crate::minter::OpError;
use crate::{Error, Result};

impl Minter {
    /// Mint one identifier.
    pub fn mint(&self) -> Result<String> {
        self.with_session(mint_one)
    }

    /// Mint up to `count` identifiers (1..=10 000). Stops early on
    /// exhaustion and returns the successfully minted prefix.
    pub fn mint_multiple(&self, count: usize) -> Result<Vec<String>> {
        self.with_session(|session| {
            check_batch("mint", count)?;
            let mut out = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                match mint_one(session) {
                    Ok(id) => out.push(id),
                    Err(Error::Op(OpError::Exhausted { .. })) if !out.is_empty() => break,
                    Err(e) => return Err(e),
                }
            }
            Ok(out)
        })
    }
}

pub(crate) fn check_batch(what: &str, count: usize) -> Result<()> {
    if count == 0 || count > MAX_BATCH {
        return Err(CoreError::bad_input(
            format!("{what} count"),
            format!("{count} is not between 1 and {MAX_BATCH}"),
        )
        .into());
    }
    Ok(())
}

pub(crate) fn mint_one(session: &mut Session) -> Result<String> {
    if session.admin.template.is_none() {
        return Err(OpError::BindOnly.into());
    }

    // Fast path: a pre-generated identifier is ready to issue.
    if session.read_u64(admin::PREGENERATED)? > 0
        && let Some(id) = pregen::pop(session)?
    {
        return Ok(id);
    }

    // Queue path: re-issue the first ripe, valid entry.
    if session.read_u64(admin::QUEUED)? > 0
        && let Some(id) = queue::consume_ripe(session)?
    {
        commit_issue(session, &id)?;
        return Ok(id);
    }

    // Generator path.
    let id = generate_cleared(session)?;
    commit_issue(session, &id)?;
    Ok(id)
}

/// Run the generator until a candidate clears the per-id guards.
pub(crate) fn generate_cleared(session: &mut Session) -> Result<String> {
    loop {
        let candidate = next_candidate(session)?;
        if clears_guards(session, &candidate)? {
            return Ok(candidate);
        }
    }
}

/// Steps 3a-3d: exhaustion/wrap handling, counter advance, encoding.
/// Returns one fully-formed candidate; per-id guards come after.
pub(crate) fn next_candidate(session: &mut Session) -> Result<String> {
    let template = session
        .admin
        .template
        .clone()
        .ok_or(OpError::BindOnly)?;
    let bounded = session.admin.oatop != NOLIMIT;

    loop {
        let oacounter = session.read_u64(admin::OACOUNTER)?;
        if bounded && oacounter >= session.admin.oatop as u64 {
            if session.admin.longterm || !session.admin.wrap {
                session.log_event(&format!(
                    "error: identifiers exhausted (stopped at oacounter {oacounter})"
                ));
                return Err(OpError::Exhausted {
                    template: template.to_string(),
                }
                .into());
            }
            session.log_event(&format!(
                "note: identifiers exhausted at oacounter {oacounter}; wrapping to zero"
            ));
            session.write_u64(admin::OACOUNTER, 0)?;
            if template.mask.mode == GenMode::Random {
                let (total, percounter) = (session.admin.oatop as u64, session.admin.percounter);
                super::create::init_subcounters(session, total, percounter)?;
            }
            continue;
        }

        let n = match template.mask.mode {
            GenMode::Sequential | GenMode::SequentialUnbounded => {
                session.write_u64(admin::OACOUNTER, oacounter + 1)?;
                oacounter
            }
            GenMode::Random => {
                let saclist = session
                    .get_str(&admin::akey(admin::SACLIST))?
                    .unwrap_or_default();
                let active: Vec<&str> = saclist.split_whitespace().collect();
                if active.is_empty() {
                    // Counter drain and oacounter reaching oatop coincide;
                    // an empty list with room left means damaged state.
                    session.log_event("error: no active sub-counters remain");
                    return Err(OpError::Exhausted {
                        template: template.to_string(),
                    }
                    .into());
                }
                let mut lcg = Lcg48::seed(oacounter as u32);
                let pick = active[lcg.int_rand(active.len() as u64) as usize];
                let counter: u64 = pick[1..].parse().map_err(|_| {
                    CoreError::bad_input("saclist entry", format!("malformed entry {pick:?}"))
                })?;
                let value = session.read_u64_key(&admin::counter_value_key(counter))?;
                let top = session.read_u64_key(&admin::counter_top_key(counter))?;
                session.set_str(
                    &admin::counter_value_key(counter),
                    &(value + 1).to_string(),
                )?;
                session.write_u64(admin::OACOUNTER, oacounter + 1)?;
                if value + 1 >= top {
                    retire_subcounter(session, pick)?;
                }
                counter * session.admin.percounter + value + 1
            }
        };

        let mut id = format!(
            "{}{}",
            session.admin.firstpart,
            n2xdig(n, &template.mask)?
        );
        if session.admin.addcheckchar {
            id = append_checkchar(&id, session.admin.checkrep);
        }
        return Ok(id);
    }
}

/// Move a drained sub-counter from the active to the inactive list.
fn retire_subcounter(session: &mut Session, name: &str) -> Result<()> {
    let saclist = session
        .get_str(&admin::akey(admin::SACLIST))?
        .unwrap_or_default();
    let remaining: String = saclist
        .split_whitespace()
        .filter(|c| *c != name)
        .map(|c| format!("{c} "))
        .collect();
    session.set_str(&admin::akey(admin::SACLIST), &remaining)?;
    let mut siclist = session
        .get_str(&admin::akey(admin::SICLIST))?
        .unwrap_or_default();
    siclist.push_str(&format!("{name} "));
    session.set_str(&admin::akey(admin::SICLIST), &siclist)?;
    Ok(())
}

/// Step 3e: per-id guards. False means skip this candidate and draw again.
fn clears_guards(session: &mut Session, id: &str) -> Result<bool> {
    // A held identifier is reserved, never issued from the generator.
    if session.store.exists(&admin::hold_key(id))? {
        return Ok(false);
    }
    let Some(raw) = session.get_str(&admin::circ_key(id))? else {
        return Ok(true);
    };
    let circ = Circulation::parse(&raw)?;
    match circ.status() {
        // Queued and pooled ids will surface through their own paths.
        Some(Status::Queued) | Some(Status::Pregenerated) => Ok(false),
        Some(Status::Issued) => {
            if session.admin.longterm || !session.admin.wrap {
                session.log_event(&format!(
                    "error: generator reached already-issued identifier {id}; skipping"
                ));
                Ok(false)
            } else {
                // Short-term wrapping minter: silent re-issue is allowed.
                Ok(true)
            }
        }
        Some(Status::Unqueued) => {
            session.log_event(&format!(
                "note: generator skipping unqueued identifier {id}"
            ));
            Ok(false)
        }
        None => {
            session.log_event(&format!(
                "error: {id} has unexpected circulation state {:?}; skipping",
                circ.svec
            ));
            Ok(false)
        }
    }
}

/// Step 3f: write the circulation record, shed residual bindings, and for
/// long-term minters place the automatic hold.
pub(crate) fn commit_issue(session: &mut Session, id: &str) -> Result<()> {
    let now = utc_stamp();
    let oacounter = session.read_u64(admin::OACOUNTER)?;
    let contact = session.contact.clone();
    let circ = match session.get_str(&admin::circ_key(id))? {
        Some(raw) => {
            let mut circ = Circulation::parse(&raw)?;
            circ.push(Status::Issued, now, contact, oacounter);
            circ
        }
        None => Circulation::new(Status::Issued, now, contact, oacounter),
    };
    session.set_str(&admin::circ_key(id), &circ.to_string())?;
    purge_bindings(session, id)?;
    if session.admin.longterm && !session.store.exists(&admin::hold_key(id))? {
        session.store.set(&admin::hold_key(id), b"1")?;
        session.bump(admin::HELD, 1)?;
    }
    Ok(())
}

/// Delete every non-admin binding under `id`.
pub(crate) fn purge_bindings(session: &mut Session, id: &str) -> Result<()> {
    let prefix = format!("{id}\t");
    let admin_sub = format!("{id}{}", admin::ID_ADMIN_PREFIX);
    let pairs = session.store.range(prefix.as_bytes(), None)?;
    for (key, _) in pairs {
        if !key.starts_with(admin_sub.as_bytes()) {
            session.store.delete(&key)?;
        }
    }
    Ok(())
}

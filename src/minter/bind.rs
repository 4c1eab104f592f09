//! Binding engine: attach named element values to identifiers, fetch them
//! back, and resolve idmap indirection.

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use super::admin;
use super::mint::check_batch;
use super::session::{Minter, Session};
use crate::core::{Circulation, CoreError, Template};
use crate::minter::OpError;
use crate::Result;

/// How a binding operation treats pre-existing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindHow {
    /// Replace unconditionally.
    Set,
    /// Create; fail if present.
    New,
    /// Replace; fail if absent.
    Replace,
    /// Concatenate to the end; fail if absent.
    Append,
    /// Concatenate to the front; fail if absent.
    Prepend,
    /// Remove; absence is not an error.
    Delete,
    /// Mint a fresh id (the id argument must be the sentinel `new`),
    /// then bind as `new`.
    Mint,
}

impl fmt::Display for BindHow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BindHow::Set => "set",
            BindHow::New => "new",
            BindHow::Replace => "replace",
            BindHow::Append => "append",
            BindHow::Prepend => "prepend",
            BindHow::Delete => "delete",
            BindHow::Mint => "mint",
        };
        f.write_str(s)
    }
}

impl FromStr for BindHow {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, CoreError> {
        match s {
            "set" => Ok(BindHow::Set),
            "new" => Ok(BindHow::New),
            "replace" => Ok(BindHow::Replace),
            "append" | "add" => Ok(BindHow::Append),
            "prepend" | "insert" => Ok(BindHow::Prepend),
            "delete" | "purge" => Ok(BindHow::Delete),
            "mint" => Ok(BindHow::Mint),
            other => Err(CoreError::bad_input(
                "bind how",
                format!("`{other}` is not a binding operation"),
            )),
        }
    }
}

/// One entry of a [`Minter::bind_multiple`] batch.
#[derive(Debug, Clone)]
pub struct BindEntry {
    pub how: BindHow,
    pub id: String,
    pub elem: String,
    pub value: String,
}

/// What a fetch saw for one identifier.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub id: String,
    pub circulation: Option<Circulation>,
    pub held: bool,
    /// `(element, value)` pairs, admin sub-keys excluded.
    pub bindings: Vec<(String, String)>,
}

impl Minter {
    /// Bind `value` to `(id, elem)` per `how`. Returns the id bound, which
    /// for the `mint` how is freshly minted.
    pub fn bind(
        &self,
        how: BindHow,
        id: &str,
        elem: &str,
        value: &str,
        validate: bool,
    ) -> Result<String> {
        if how == BindHow::Mint {
            if id != "new" {
                return self.with_session(|_| {
                    Err(CoreError::bad_input(
                        "identifier",
                        "the `mint` binding requires the sentinel id `new`",
                    )
                    .into())
                });
            }
            // The only intra-operation lock window: mint takes and releases
            // the session lock before the bind re-acquires it.
            let minted = self.mint()?;
            self.with_session(|s| bind_one(s, BindHow::New, &minted, elem, value, false))?;
            return Ok(minted);
        }
        self.with_session(|s| bind_one(s, how, id, elem, value, validate))
    }

    /// Apply up to 10 000 bindings. Entries failing pre-validation come
    /// back as `None` without aborting the batch; the rest are applied
    /// under a single lock acquisition (except nested mints) and yield the
    /// bound id, in input order.
    pub fn bind_multiple(&self, entries: &[BindEntry]) -> Result<Vec<Option<String>>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        check_batch("bind", entries.len())?;

        // Pre-validate outside the lock.
        let admitted: Vec<bool> = entries
            .iter()
            .map(|e| prevalidate(e).is_ok())
            .collect();

        // Apply under one lock acquisition; only a nested mint releases it
        // (and re-acquires for its bind), splitting the batch into runs.
        let mut results: Vec<Option<String>> = vec![None; entries.len()];
        let mut i = 0;
        while i < entries.len() {
            if entries[i].how == BindHow::Mint {
                let entry = &entries[i];
                if admitted[i]
                    && let Ok(id) =
                        self.bind(BindHow::Mint, &entry.id, &entry.elem, &entry.value, false)
                {
                    results[i] = Some(id);
                }
                i += 1;
                continue;
            }
            let start = i;
            while i < entries.len() && entries[i].how != BindHow::Mint {
                i += 1;
            }
            let run = &entries[start..i];
            self.with_session(|session| {
                for (j, entry) in run.iter().enumerate() {
                    if !admitted[start + j] {
                        continue;
                    }
                    match bind_one(session, entry.how, &entry.id, &entry.elem, &entry.value, true)
                    {
                        Ok(id) => results[start + j] = Some(id),
                        Err(e) => session.record_err(&e),
                    }
                }
                Ok(())
            })?;
        }
        Ok(results)
    }

    /// Read bindings under `id`. With `elems` empty, every non-admin
    /// element is returned; otherwise only the named ones, with idmap
    /// fallback for elements that have no direct binding.
    pub fn fetch(&self, id: &str, elems: &[String]) -> Result<FetchResult> {
        self.with_session(|s| fetch_one(s, id, elems))
    }

    /// Fetch up to 10 000 identifiers, results in input order.
    pub fn fetch_multiple(&self, ids: &[String], elems: &[String]) -> Result<Vec<FetchResult>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        check_batch("fetch", ids.len())?;
        self.with_session(|s| {
            ids.iter().map(|id| fetch_one(s, id, elems)).collect()
        })
    }

    /// Store a user note under the reserved `:/:/` namespace.
    pub fn note(&self, key: &str, value: &str) -> Result<()> {
        self.with_session(|s| {
            if key.is_empty() {
                return Err(CoreError::bad_input("note key", "must not be empty").into());
            }
            s.store.set(&admin::note_key(key), value.as_bytes())?;
            Ok(())
        })
    }

    /// Validate `id`. `template` of `None` means the session's own
    /// template and firstpart; an explicit template validates against its
    /// bare prefix.
    pub fn validate_id(&self, template: Option<&Template>, id: &str) -> Result<()> {
        self.with_session(|s| match template {
            Some(t) => {
                let firstpart = t.prefix.clone();
                t.matches(id, &firstpart).map_err(Into::into)
            }
            None => {
                let t = s.admin.template.clone().ok_or_else(|| {
                    CoreError::bad_input("template", "this minter has no template to validate against")
                })?;
                t.matches(id, &s.admin.firstpart).map_err(Into::into)
            }
        })
    }
}

fn prevalidate(entry: &BindEntry) -> Result<()> {
    if entry.elem.is_empty() {
        return Err(CoreError::bad_input("element", "must not be empty").into());
    }
    if entry.id.is_empty() {
        return Err(CoreError::bad_input("identifier", "must not be empty").into());
    }
    if entry.how == BindHow::Mint && entry.id != "new" {
        return Err(CoreError::bad_input(
            "identifier",
            "the `mint` binding requires the sentinel id `new`",
        )
        .into());
    }
    Ok(())
}

fn check_name(what: &'static str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CoreError::bad_input(what, "must not be empty").into());
    }
    if name.contains('\t') {
        return Err(CoreError::bad_input(what, "must not contain a tab").into());
    }
    Ok(())
}

pub(crate) fn bind_one(
    session: &mut Session,
    how: BindHow,
    id: &str,
    elem: &str,
    value: &str,
    validate: bool,
) -> Result<String> {
    check_name("element", elem)?;
    check_name("identifier", id)?;

    let key = if let Some(special) = id.strip_prefix(':') {
        // Reserved identifiers: only the idmap family is known. The elem
        // argument carries the match pattern; the mapped element name is
        // part of the identifier.
        let Some(mapped) = special.strip_prefix("idmap/").filter(|m| !m.is_empty()) else {
            return Err(CoreError::bad_input(
                "identifier",
                format!("unknown reserved identifier `{id}`"),
            )
            .into());
        };
        if how != BindHow::Delete {
            Regex::new(elem).map_err(|e| {
                CoreError::bad_input("idmap pattern", format!("{elem:?} does not compile: {e}"))
            })?;
        }
        admin::idmap_key(mapped, elem)
    } else {
        if elem.starts_with(":/") {
            return Err(CoreError::bad_input("element", "the `:/` namespace is reserved").into());
        }
        if validate
            && session.admin.genonly
            && let Some(template) = session.admin.template.clone()
        {
            template.matches(id, &session.admin.firstpart)?;
        }
        // Long-term ids must be issued, or at least reserved with a hold,
        // before anything may be bound to them.
        if session.admin.longterm
            && !session.store.exists(&admin::circ_key(id))?
            && !session.store.exists(&admin::hold_key(id))?
        {
            return Err(OpError::LongtermUnissued { id: id.to_string() }.into());
        }
        admin::binding_key(id, elem)
    };

    let existing = session.store.get(&key)?;
    match how {
        BindHow::Set | BindHow::Mint => session.store.set(&key, value.as_bytes())?,
        BindHow::New => {
            if existing.is_some() {
                return Err(OpError::conflict(
                    id,
                    format!("element `{elem}` is already bound; `new` refused"),
                )
                .into());
            }
            session.store.set(&key, value.as_bytes())?;
        }
        BindHow::Replace => {
            if existing.is_none() {
                return Err(OpError::conflict(
                    id,
                    format!("element `{elem}` is not bound; `replace` refused"),
                )
                .into());
            }
            session.store.set(&key, value.as_bytes())?;
        }
        BindHow::Append => {
            let Some(mut current) = existing else {
                return Err(OpError::conflict(
                    id,
                    format!("element `{elem}` is not bound; `append` refused"),
                )
                .into());
            };
            current.extend_from_slice(value.as_bytes());
            session.store.set(&key, &current)?;
        }
        BindHow::Prepend => {
            let Some(current) = existing else {
                return Err(OpError::conflict(
                    id,
                    format!("element `{elem}` is not bound; `prepend` refused"),
                )
                .into());
            };
            let mut joined = value.as_bytes().to_vec();
            joined.extend_from_slice(&current);
            session.store.set(&key, &joined)?;
        }
        BindHow::Delete => session.store.delete(&key)?,
    }
    Ok(id.to_string())
}

fn fetch_one(session: &Session, id: &str, elems: &[String]) -> Result<FetchResult> {
    check_name("identifier", id)?;
    let circulation = session
        .get_str(&admin::circ_key(id))?
        .map(|raw| Circulation::parse(&raw))
        .transpose()?;
    let held = session.store.exists(&admin::hold_key(id))?;

    let mut bindings = Vec::new();
    if elems.is_empty() {
        let prefix = format!("{id}\t");
        let admin_sub = format!("{id}{}", admin::ID_ADMIN_PREFIX);
        for (key, value) in session.store.range(prefix.as_bytes(), None)? {
            if key.starts_with(admin_sub.as_bytes()) {
                continue;
            }
            let elem = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            bindings.push((elem, String::from_utf8_lossy(&value).into_owned()));
        }
        if bindings.is_empty() && circulation.is_none() && !held {
            return Err(OpError::NotFound {
                what: format!("identifier {id}"),
            }
            .into());
        }
    } else {
        for elem in elems {
            if let Some(value) = session.store.get(&admin::binding_key(id, elem))? {
                bindings.push((elem.clone(), String::from_utf8_lossy(&value).into_owned()));
            } else if let Some(mapped) = idmap_substitute(session, id, elem)? {
                bindings.push((elem.clone(), mapped));
            }
        }
        if bindings.is_empty() {
            return Err(OpError::NotFound {
                what: format!("element{} under {id}", if elems.len() == 1 { "" } else { "s" }),
            }
            .into());
        }
    }

    Ok(FetchResult {
        id: id.to_string(),
        circulation,
        held,
        bindings,
    })
}

/// Idmap fallback: the first pattern (ascending key order) matching the
/// identifier supplies one substitution. Resolution is a single step; the
/// result is never re-resolved, so pattern cycles cannot loop.
fn idmap_substitute(session: &Session, id: &str, elem: &str) -> Result<Option<String>> {
    let prefix = admin::idmap_prefix(elem);
    for (key, value) in session.store.range(&prefix, None)? {
        let pattern = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
        let Ok(re) = Regex::new(&pattern) else {
            tracing::warn!("idmap pattern {pattern:?} no longer compiles; skipping");
            continue;
        };
        if re.is_match(id) {
            let replacement = String::from_utf8_lossy(&value).into_owned();
            return Ok(Some(re.replace(id, replacement.as_str()).into_owned()));
        }
    }
    Ok(None)
}

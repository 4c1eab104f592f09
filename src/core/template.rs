//! Template parsing: `prefix.mask` into namespace geometry.
//!
//! A template fixes everything about an identifier space: the literal
//! prefix, the generation order (random / sequential / unbounded), one
//! repertoire per position, and whether a check character is appended.

use std::fmt;

use super::alphabet::{Repertoire, verify_checkchar};
use super::error::CoreError;

/// Capacity sentinel for unbounded (`z`) templates, as persisted.
pub const NOLIMIT: i64 = -1;

/// Generation order encoded by the mask's leading mode character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenMode {
    /// `r`: pseudo-random order over a bounded space.
    Random,
    /// `s`: counting order over a bounded space.
    Sequential,
    /// `z`: counting order, leftmost repertoire repeats without bound.
    SequentialUnbounded,
}

impl GenMode {
    pub fn mode_char(self) -> char {
        match self {
            GenMode::Random => 'r',
            GenMode::Sequential => 's',
            GenMode::SequentialUnbounded => 'z',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GenMode::Random => "random",
            GenMode::Sequential | GenMode::SequentialUnbounded => "sequential",
        }
    }
}

/// The mask half of a template: mode, per-position repertoires, check flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pub mode: GenMode,
    pub chars: Vec<Repertoire>,
    pub check: bool,
}

impl Mask {
    /// Capacity of the fixed part; `None` for unbounded masks.
    pub fn capacity(&self) -> Option<u64> {
        match self.mode {
            GenMode::SequentialUnbounded => None,
            _ => Some(self.chars.iter().map(|r| r.len()).product()),
        }
    }

    /// Repertoire used for check characters, per the auto-detect rule.
    pub fn check_repertoire(&self) -> Repertoire {
        Repertoire::detect(&self.chars).unwrap_or(Repertoire::E)
    }
}

impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mode.mode_char())?;
        for r in &self.chars {
            write!(f, "{}", r.mask_char())?;
        }
        if self.check {
            write!(f, "k")?;
        }
        Ok(())
    }
}

/// A parsed `prefix.mask` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub prefix: String,
    pub mask: Mask,
}

impl Template {
    /// Parse a template string.
    ///
    /// Grammar: `prefix ::= [A-Za-z0-9]*`, `mask ::= [rsz][deixvEwcl]+ k?`.
    /// The failure message names the offending position.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let bad = |reason: String| CoreError::BadTemplate {
            template: s.to_string(),
            reason,
        };

        let Some((prefix, mask_str)) = s.split_once('.') else {
            return Err(bad("missing `.` between prefix and mask".into()));
        };
        if let Some(pos) = prefix.chars().position(|c| !c.is_ascii_alphanumeric()) {
            return Err(bad(format!(
                "prefix char {:?} at position {} is not alphanumeric",
                prefix.chars().nth(pos).unwrap_or('?'),
                pos + 1
            )));
        }

        let mut chars = mask_str.chars();
        let mode = match chars.next() {
            Some('r') => GenMode::Random,
            Some('s') => GenMode::Sequential,
            Some('z') => GenMode::SequentialUnbounded,
            Some(c) => {
                return Err(bad(format!(
                    "mask must begin with r, s or z, not {c:?}"
                )));
            }
            None => return Err(bad("empty mask".into())),
        };

        let mut reps = Vec::new();
        let mut check = false;
        for (i, c) in chars.enumerate() {
            if check {
                return Err(bad(format!(
                    "mask char {c:?} at position {} follows the final k",
                    i + 2
                )));
            }
            if c == 'k' {
                check = true;
                continue;
            }
            match Repertoire::from_mask_char(c) {
                Some(r) => reps.push(r),
                None => {
                    return Err(bad(format!(
                        "mask char {c:?} at position {} names no repertoire",
                        i + 2
                    )));
                }
            }
        }
        if reps.is_empty() {
            return Err(bad("mask has no repertoire characters".into()));
        }

        Ok(Template {
            prefix: prefix.to_string(),
            mask: Mask {
                mode,
                chars: reps,
                check,
            },
        })
    }

    /// Capacity of the identifier space; `None` means NOLIMIT.
    pub fn capacity(&self) -> Option<u64> {
        self.mask.capacity()
    }

    /// Validate `id` against this template.
    ///
    /// `firstpart` is the minted prefix (`naan/prefix`, or the bare prefix
    /// for an empty naan). Checks the prefix, per-position repertoire
    /// membership (honouring `z` run-on), and the check character.
    pub fn matches(&self, id: &str, firstpart: &str) -> Result<(), CoreError> {
        let Some(suffix) = id.strip_prefix(firstpart) else {
            return Err(CoreError::iderr(
                id,
                format!("should begin with {firstpart}"),
            ));
        };

        let mut body: Vec<char> = suffix.chars().collect();
        if self.mask.check {
            let Some(_) = body.pop() else {
                return Err(CoreError::iderr(id, "is too short for a check character"));
            };
            let rep = self.mask.check_repertoire();
            if !verify_checkchar(id, rep) {
                return Err(CoreError::iderr(id, "has a check-character mismatch"));
            }
        }

        let fixed = self.mask.chars.len();
        if body.len() < fixed {
            return Err(CoreError::iderr(
                id,
                format!("is too short for mask {}", self.mask),
            ));
        }
        if body.len() > fixed && self.mask.mode != GenMode::SequentialUnbounded {
            return Err(CoreError::iderr(
                id,
                format!("is too long for mask {}", self.mask),
            ));
        }

        // Align right-to-left; surplus leading chars fall to the run-on
        // repertoire (z masks only, checked above).
        let run_on = self.mask.chars[0];
        let surplus = body.len() - fixed;
        for (i, c) in body.iter().enumerate() {
            let rep = if i < surplus {
                run_on
            } else {
                self.mask.chars[i - surplus]
            };
            if !rep.contains(*c) {
                return Err(CoreError::iderr(
                    id,
                    format!(
                        "char {:?} conflicts with repertoire {} of mask {}",
                        c,
                        rep.mask_char(),
                        self.mask
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.prefix, self.mask)
    }
}

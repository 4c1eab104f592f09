//! Named character repertoires and the integer-to-identifier codec.
//!
//! A repertoire's character list order *is* the integer-to-digit mapping and
//! must stay byte-identical across implementations: check characters and
//! minted sequences are computed from character indexes.

use std::fmt;

use super::error::CoreError;
use super::template::{GenMode, Mask};

/// Digits `0`-`9`.
const ALPHABET_D: &str = "0123456789";
/// Extended: digits plus consonants, no vowels, no `l`.
const ALPHABET_E: &str = "0123456789bcdfghjkmnpqrstvwxz";
/// Digits plus `x`.
const ALPHABET_I: &str = "0123456789x";
/// Lowercase hex plus underscore.
const ALPHABET_X: &str = "0123456789abcdef_";
/// Lowercase alphanumeric plus underscore.
const ALPHABET_V: &str = "0123456789abcdefghijklmnopqrstuvwxyz_";
/// Extended, mixed case.
const ALPHABET_UPPER_E: &str = "123456789bcdfghjkmnpqrstvwxzBCDFGHJKMNPQRSTVWXZ";
/// Alphanumeric plus a little punctuation.
const ALPHABET_W: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ#*+@_";
/// Printable ASCII minus `% - . / \`.
const ALPHABET_C: &str = "!\"#$&'()*+,0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[]^_`abcdefghijklmnopqrstuvwxyz{|}~";
/// Alphanumeric without lowercase `l`.
const ALPHABET_L: &str = "0123456789abcdefghijkmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Sentinel appended by [`n2xdig`] where a check character will go.
pub const CHECKCHAR_SENTINEL: char = '+';

/// One of the nine named character repertoires.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repertoire {
    D,
    E,
    I,
    X,
    V,
    UpperE,
    W,
    C,
    L,
}

/// Detection order: smallest repertoire that covers the mask wins.
const DETECT_ORDER: [Repertoire; 9] = [
    Repertoire::D,
    Repertoire::I,
    Repertoire::X,
    Repertoire::E,
    Repertoire::V,
    Repertoire::UpperE,
    Repertoire::L,
    Repertoire::W,
    Repertoire::C,
];

impl Repertoire {
    /// Parse a single mask character.
    pub fn from_mask_char(c: char) -> Option<Self> {
        match c {
            'd' => Some(Repertoire::D),
            'e' => Some(Repertoire::E),
            'i' => Some(Repertoire::I),
            'x' => Some(Repertoire::X),
            'v' => Some(Repertoire::V),
            'E' => Some(Repertoire::UpperE),
            'w' => Some(Repertoire::W),
            'c' => Some(Repertoire::C),
            'l' => Some(Repertoire::L),
            _ => None,
        }
    }

    /// The mask character naming this repertoire.
    pub fn mask_char(self) -> char {
        match self {
            Repertoire::D => 'd',
            Repertoire::E => 'e',
            Repertoire::I => 'i',
            Repertoire::X => 'x',
            Repertoire::V => 'v',
            Repertoire::UpperE => 'E',
            Repertoire::W => 'w',
            Repertoire::C => 'c',
            Repertoire::L => 'l',
        }
    }

    /// The ordered character list.
    pub fn chars(self) -> &'static str {
        match self {
            Repertoire::D => ALPHABET_D,
            Repertoire::E => ALPHABET_E,
            Repertoire::I => ALPHABET_I,
            Repertoire::X => ALPHABET_X,
            Repertoire::V => ALPHABET_V,
            Repertoire::UpperE => ALPHABET_UPPER_E,
            Repertoire::W => ALPHABET_W,
            Repertoire::C => ALPHABET_C,
            Repertoire::L => ALPHABET_L,
        }
    }

    /// Cardinality (the encoding radix for this position).
    pub fn len(self) -> u64 {
        self.chars().len() as u64
    }

    /// Index of `c` in the repertoire, if present.
    pub fn index_of(self, c: char) -> Option<usize> {
        self.chars().find(c)
    }

    pub fn contains(self, c: char) -> bool {
        self.index_of(c).is_some()
    }

    /// The digit at index `i`. Callers keep `i < len()`.
    fn digit(self, i: u64) -> char {
        self.chars().as_bytes()[i as usize] as char
    }

    /// Smallest repertoire containing every character of every listed
    /// repertoire. Masks mixing only `d` and `e` retain `e` for historical
    /// compatibility.
    pub fn detect(used: &[Repertoire]) -> Option<Repertoire> {
        if !used.is_empty()
            && used
                .iter()
                .all(|r| matches!(r, Repertoire::D | Repertoire::E))
        {
            return Some(Repertoire::E);
        }
        DETECT_ORDER.iter().copied().find(|candidate| {
            used.iter()
                .all(|r| r.chars().chars().all(|c| candidate.contains(c)))
        })
    }
}

impl fmt::Debug for Repertoire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Repertoire({})", self.mask_char())
    }
}

impl fmt::Display for Repertoire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.chars())
    }
}

/// Encode `n` under `mask`.
///
/// Mask characters are consumed right-to-left, least significant first; the
/// fixed part is always fully consumed, so small numbers come out
/// zero-padded to the mask width. In `z` mode the leftmost repertoire
/// repeats indefinitely once the fixed part runs out. A mask ending in `k`
/// gets the `+` sentinel appended for the eventual check character.
///
/// The parser never produces a mask without repertoire characters, but a
/// hand-built one is refused rather than encoded.
pub fn n2xdig(n: u64, mask: &Mask) -> Result<String, CoreError> {
    let Some(run_on) = mask.chars.first().copied() else {
        return Err(CoreError::bad_input(
            "mask",
            "has no repertoire characters to encode with",
        ));
    };
    let mut num = n;
    let mut digits: Vec<char> = Vec::with_capacity(mask.chars.len() + 1);
    let mut positions = mask.chars.iter().rev();

    loop {
        let rep = match positions.next() {
            Some(r) => *r,
            None => {
                if num == 0 {
                    break;
                }
                match mask.mode {
                    GenMode::SequentialUnbounded => run_on,
                    // Caller guarantees capacity for bounded masks.
                    _ => break,
                }
            }
        };
        let div = rep.len();
        digits.push(rep.digit(num % div));
        num /= div;
        if num == 0 && digits.len() >= mask.chars.len() {
            break;
        }
    }

    let mut s: String = digits.iter().rev().collect();
    if mask.check {
        s.push(CHECKCHAR_SENTINEL);
    }
    Ok(s)
}

/// Compute the check character for `id` over `rep`.
///
/// Every character of the identifier except a trailing `+` contributes
/// `index * position` (1-based); characters absent from the repertoire
/// contribute zero but still advance the position.
pub fn checkchar(id: &str, rep: Repertoire) -> char {
    let body = id.strip_suffix(CHECKCHAR_SENTINEL).unwrap_or(id);
    let modulus = rep.len();
    let mut sum: u64 = 0;
    for (pos, c) in body.chars().enumerate() {
        let idx = rep.index_of(c).unwrap_or(0) as u64;
        sum += idx * (pos as u64 + 1);
    }
    rep.digit(sum % modulus)
}

/// Append the check character, replacing a trailing `+` sentinel if present.
pub fn append_checkchar(id: &str, rep: Repertoire) -> String {
    let c = checkchar(id, rep);
    let mut out = id
        .strip_suffix(CHECKCHAR_SENTINEL)
        .unwrap_or(id)
        .to_string();
    out.push(c);
    out
}

/// Verify that the final character of `id` is the correct check character
/// for the rest of the string.
pub fn verify_checkchar(id: &str, rep: Repertoire) -> bool {
    let Some(given) = id.chars().last() else {
        return false;
    };
    let body: String = {
        let mut s = id.to_string();
        s.pop();
        s
    };
    checkchar(&body, rep) == given
}

/// Resolve a repertoire by its mask character, for admin-record round
/// trips.
pub fn repertoire_by_name(name: &str) -> Result<Repertoire, CoreError> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Repertoire::from_mask_char(c).ok_or_else(|| CoreError::BadInput {
            what: "check repertoire".into(),
            reason: format!("unknown repertoire `{name}`"),
        }),
        _ => Err(CoreError::BadInput {
            what: "check repertoire".into(),
            reason: format!("unknown repertoire `{name}`"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::template::Template;

    fn mask_of(template: &str) -> Mask {
        Template::parse(template).unwrap().mask
    }

    #[test]
    fn tables_are_bit_exact() {
        assert_eq!(Repertoire::D.chars(), "0123456789");
        assert_eq!(Repertoire::E.chars(), "0123456789bcdfghjkmnpqrstvwxz");
        assert_eq!(Repertoire::I.chars(), "0123456789x");
        assert_eq!(Repertoire::X.chars(), "0123456789abcdef_");
        assert_eq!(
            Repertoire::V.chars(),
            "0123456789abcdefghijklmnopqrstuvwxyz_"
        );
        assert_eq!(
            Repertoire::UpperE.chars(),
            "123456789bcdfghjkmnpqrstvwxzBCDFGHJKMNPQRSTVWXZ"
        );
        assert_eq!(
            Repertoire::W.chars(),
            "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ#*+@_"
        );
        assert_eq!(
            Repertoire::L.chars(),
            "0123456789abcdefghijkmnopqrstuvwxyzABCDEFGHIJKMNOPQRSTUVWXYZ"
        );
    }

    #[test]
    fn cardinalities() {
        assert_eq!(Repertoire::D.len(), 10);
        assert_eq!(Repertoire::E.len(), 29);
        assert_eq!(Repertoire::I.len(), 11);
        assert_eq!(Repertoire::X.len(), 17);
        assert_eq!(Repertoire::V.len(), 37);
        assert_eq!(Repertoire::UpperE.len(), 47);
        assert_eq!(Repertoire::W.len(), 68);
        assert_eq!(Repertoire::C.len(), 89);
        assert_eq!(Repertoire::L.len(), 61);
    }

    #[test]
    fn c_excludes_exactly_five_printables() {
        for b in 0x21u8..=0x7e {
            let c = b as char;
            let excluded = matches!(c, '%' | '-' | '.' | '/' | '\\');
            assert_eq!(Repertoire::C.contains(c), !excluded, "char {c:?}");
        }
    }

    #[test]
    fn encode_pads_to_mask_width() {
        let mask = mask_of(".sdd");
        assert_eq!(n2xdig(0, &mask).unwrap(), "00");
        assert_eq!(n2xdig(1, &mask).unwrap(), "01");
        assert_eq!(n2xdig(99, &mask).unwrap(), "99");
    }

    #[test]
    fn encode_mixed_radix() {
        // "de": d is most significant (radix 10), e least (radix 29).
        let mask = mask_of("x.rde");
        assert_eq!(n2xdig(49, &mask).unwrap(), "1p");
        assert_eq!(n2xdig(265, &mask).unwrap(), "94");
    }

    #[test]
    fn encode_unbounded_grows() {
        let mask = mask_of(".zd");
        assert_eq!(n2xdig(7, &mask).unwrap(), "7");
        assert_eq!(n2xdig(123, &mask).unwrap(), "123");
    }

    #[test]
    fn encode_unbounded_repeats_leftmost_repertoire() {
        // "zed": e runs on after the fixed e and d are consumed.
        let mask = mask_of(".zed");
        let s = n2xdig(29 * 10 * 5 + 13, &mask).unwrap();
        assert_eq!(s.len(), 3);
        assert!(
            s.chars()
                .all(|c| "0123456789bcdfghjkmnpqrstvwxz".contains(c))
        );
    }

    #[test]
    fn encode_appends_sentinel_for_check_masks() {
        let mask = mask_of("fk.redek");
        assert_eq!(n2xdig(1422, &mask).unwrap(), "491+");
    }

    #[test]
    fn encode_refuses_empty_mask() {
        let mask = Mask {
            mode: GenMode::Sequential,
            chars: Vec::new(),
            check: false,
        };
        assert!(n2xdig(5, &mask).is_err());
    }

    #[test]
    fn checkchar_matches_minted_value() {
        assert_eq!(checkchar("fk491", Repertoire::E), 'f');
        assert_eq!(append_checkchar("fk491+", Repertoire::E), "fk491f");
        assert!(verify_checkchar("fk491f", Repertoire::E));
    }

    #[test]
    fn checkchar_detects_substitution_and_transposition() {
        assert!(!verify_checkchar("fk492f", Repertoire::E));
        assert!(!verify_checkchar("fk941f", Repertoire::E));
    }

    #[test]
    fn checkchar_skips_foreign_chars_but_counts_position() {
        // '/' is not in e; it contributes 0 at its position.
        let got = checkchar("13030/tst3", Repertoire::E);
        let manual: u64 = "13030/tst3"
            .chars()
            .enumerate()
            .map(|(i, c)| Repertoire::E.index_of(c).unwrap_or(0) as u64 * (i as u64 + 1))
            .sum();
        assert_eq!(
            got,
            Repertoire::E.chars().as_bytes()[(manual % 29) as usize] as char
        );
    }

    #[test]
    fn checkchar_roundtrip() {
        for id in ["ark13030", "x9q2", "0", "fk4"] {
            let full = append_checkchar(id, Repertoire::E);
            assert!(verify_checkchar(&full, Repertoire::E), "id {id}");
        }
    }

    #[test]
    fn detect_prefers_smallest() {
        assert_eq!(
            Repertoire::detect(&[Repertoire::D]),
            Some(Repertoire::E),
            "d-only masks keep e"
        );
        assert_eq!(
            Repertoire::detect(&[Repertoire::D, Repertoire::E]),
            Some(Repertoire::E)
        );
        assert_eq!(Repertoire::detect(&[Repertoire::X]), Some(Repertoire::X));
        assert_eq!(
            Repertoire::detect(&[Repertoire::X, Repertoire::V]),
            Some(Repertoire::V)
        );
    }

    #[test]
    fn detect_mixed_case_falls_through_to_covering_set() {
        // E plus v needs both cases and digits together: w.
        assert_eq!(
            Repertoire::detect(&[Repertoire::UpperE, Repertoire::V]),
            Some(Repertoire::W)
        );
    }
}

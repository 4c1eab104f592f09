//! Core domain types for noid-rs.
//!
//! Module hierarchy follows dependency order:
//! - error: CoreError refusal states
//! - alphabet: repertoires, integer codec, check characters
//! - template: `prefix.mask` parsing and id validation
//! - rng: the 48-bit LCG behind random minting
//! - circulation: per-identifier status records
//! - limits: batch and geometry constants

pub mod alphabet;
pub mod circulation;
pub mod error;
pub mod limits;
pub mod rng;
pub mod template;

pub use alphabet::{
    CHECKCHAR_SENTINEL, Repertoire, append_checkchar, checkchar, n2xdig, repertoire_by_name,
    verify_checkchar,
};
pub use circulation::{Circulation, Status};
pub use error::CoreError;
pub use limits::{MAX_BATCH, SUBCOUNTERS};
pub use rng::{GENERATOR_NAME, Lcg48};
pub use template::{GenMode, Mask, NOLIMIT, Template};

//! Normative limits for batch operations and counter geometry.

/// Maximum items per `mint_multiple`, `bind_multiple`, `fetch_multiple`
/// and `pregenerate` call.
pub const MAX_BATCH: usize = 10_000;

/// Number of sub-counters a bounded random space is partitioned across.
pub const SUBCOUNTERS: u64 = 293;

/// Minimum key length every backend must accept.
pub const MIN_KEY_LEN: usize = 511;

/// Queue date width: `YYYYMMDDHHMMSS`.
pub const QDATE_WIDTH: usize = 14;

/// Queue sequence-number width.
pub const SEQNUM_WIDTH: usize = 6;

/// `padwidth` for unbounded templates.
pub const UNBOUNDED_PADWIDTH: usize = 16;

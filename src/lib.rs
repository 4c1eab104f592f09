#![forbid(unsafe_code)]

//! noid-rs mints, tracks and binds Nice Opaque Identifiers: short,
//! globally-unique, optionally check-summed strings drawn without
//! replacement from a template-defined identifier space.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod minter;
mod paths;
pub mod store;
pub mod telemetry;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the working set at crate root for embedders.
pub use crate::core::{
    Circulation, CoreError, GenMode, Lcg48, MAX_BATCH, Mask, NOLIMIT, Repertoire, Status,
    Template, append_checkchar, checkchar, n2xdig, verify_checkchar,
};
pub use crate::minter::{
    BindHow, CreateArgs, DbInfoLevel, FetchResult, Minter, OpError, QueueWhen, Term,
    set_persistent_connections, unpersist,
};
pub use crate::store::{Backend, KvStore, OpenMode, StoreError};

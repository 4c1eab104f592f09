//! The minter: admin state, creation, sessions, the mint engine, the
//! queue/hold machinery, the pre-generation pool and the binding engine.
//!
//! Module hierarchy follows dependency order:
//! - error: operation refusal states
//! - admin: key layout + the per-session cache of creation parameters
//! - session: open/close lifecycle, registry, error buffer, log sink
//! - create: database materialization
//! - mint / queue / pregen: the three paths of the mint algorithm
//! - bind: element bindings, fetch, idmap
//! - info: dbinfo and dbimport

pub mod admin;
mod bind;
mod create;
mod error;
mod info;
mod mint;
mod pregen;
mod queue;
mod session;

pub use bind::{BindEntry, BindHow, FetchResult};
pub use create::{CreateArgs, Term};
pub use error::OpError;
pub use info::DbInfoLevel;
pub use queue::QueueWhen;
pub use session::{Minter, set_persistent_connections, unpersist};

//! Crate-level convenience error.
//!
//! Not a "god error": a thin wrapper over the canonical capability errors.

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::CoreError;
use crate::minter::OpError;
use crate::store::StoreError;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Op(#[from] OpError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// True for refusal states that leave no partial writes behind
    /// (validation failures, absent records); false where the backend may
    /// have committed something before failing.
    pub fn is_clean(&self) -> bool {
        match self {
            Error::Core(_) | Error::Config(_) => true,
            Error::Store(_) => false,
            Error::Op(e) => e.is_clean(),
        }
    }
}

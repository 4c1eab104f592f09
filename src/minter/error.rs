//! Operation-level errors: refusals raised while minting, queueing,
//! holding and binding against an open database.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum OpError {
    /// The identifier space is consumed and the minter may not reset.
    #[error("identifiers exhausted for template {template}")]
    Exhausted { template: String },

    /// Binding refused on a long-term id that was never issued or held.
    #[error("{id}: long-term identifiers must be issued or held before binding")]
    LongtermUnissued { id: String },

    /// Queue/hold state machine violation.
    #[error("error: a hold has been set for {id} and must be released before the identifier can be queued")]
    HeldCannotQueue { id: String },

    #[error("{id}: {reason}")]
    CirculationConflict { id: String, reason: String },

    #[error("{what} not found")]
    NotFound { what: String },

    /// The database was created without a template and only binds.
    #[error("this minter binds existing identifiers but does not generate new ones")]
    BindOnly,
}

impl OpError {
    pub fn conflict(id: impl Into<String>, reason: impl Into<String>) -> Self {
        OpError::CirculationConflict {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// True when the refusal happened before any write.
    pub fn is_clean(&self) -> bool {
        true
    }
}

//! Core capability errors (template grammar, input validation, id checks).
//!
//! These are bounded and stable: they represent domain/refusal states, not
//! library implementation details.

use thiserror::Error;

/// Canonical error enum for the core capability.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum CoreError {
    /// Template fails the `prefix.mask` grammar.
    #[error("template `{template}` is invalid: {reason}")]
    BadTemplate { template: String, reason: String },

    /// Malformed caller input outside the template grammar.
    #[error("{what} is invalid: {reason}")]
    BadInput { what: String, reason: String },

    /// An identifier failed validation against a template.
    #[error("iderr: {id} {reason}")]
    IdInvalid { id: String, reason: String },
}

impl CoreError {
    pub fn bad_input(what: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::BadInput {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub fn iderr(id: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::IdInvalid {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

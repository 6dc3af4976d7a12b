//! Crate-level error types.
//!
//! Argument validation errors surface at the API boundary before any work
//! begins. Internal invariant violations (empty majority-class input, a
//! partition with two empty sides) are bugs, not user errors, and are
//! handled with debug assertions rather than error values.

use crate::training::SplitCriterion;

/// Errors produced by training-side entry points.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A hyperparameter or input is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The selected split criterion is declared but not implemented.
    #[error("split criterion {0} is not implemented")]
    Unimplemented(SplitCriterion),
}

impl Error {
    /// Shorthand for an [`Error::InvalidArgument`] with a formatted message.
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

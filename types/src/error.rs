//! Top-level error type shared across crates.

use thiserror::Error;

/// Errors produced while constructing or parsing the fundamental types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StakeError {
    #[error("invalid 32-byte hash: {0}")]
    InvalidHash(String),

    #[error("invalid coefficient '{0}': {1}")]
    InvalidCoefficient(String, &'static str),

    #[error("unknown stake tier {0}")]
    UnknownTier(u16),
}

//! Error types for compact id sets.

use thiserror::Error;

/// Error variants for id set operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An id was pushed that is not strictly greater than the current maximum.
    #[error("id {id} is not in ascending order (current max is {max})")]
    OutOfOrder {
        /// The rejected id.
        id: u64,
        /// The largest id already in the set.
        max: u64,
    },

    /// The count word is already `u64::MAX`; no further id can be recorded.
    #[error("id count overflows u64")]
    CountOverflow,

    /// Raw parts or bytes do not describe a well-formed id set.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}

/// A specialized Result type for id set operations.
pub type Result<T> = std::result::Result<T, Error>;

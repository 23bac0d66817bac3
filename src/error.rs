//! Error types for Ferry.

use crate::memory::OffsetRange;
use thiserror::Error;

/// Result type alias using Ferry's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Ferry operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The segment allocator could not produce a usable segment.
    #[error("segment allocation failed: {0}")]
    AllocationFailed(String),

    /// An address does not fit the segment lists it was resolved against.
    #[error("address out of range ({range}): {reason}")]
    AddressOutOfRange {
        /// The offending address.
        range: OffsetRange,
        /// Which bound was violated.
        reason: String,
    },

    /// A caller-supplied resource descriptor was rejected.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// A writer or queue was configured with unusable parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid memory segment operation.
    #[error("invalid memory segment: {0}")]
    InvalidSegment(String),

    /// Record archive validation failed (rkyv).
    #[error("record validation failed: {0}")]
    ValidationFailed(String),

    /// System call error (via rustix).
    #[error("system error: {0}")]
    System(#[from] rustix::io::Errno),
}

impl Error {
    pub(crate) fn out_of_range(range: OffsetRange, reason: impl Into<String>) -> Self {
        Error::AddressOutOfRange {
            range,
            reason: reason.into(),
        }
    }
}

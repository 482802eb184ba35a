//! Scan error types.
//!
//! Provides [`ScanError`] for everything that can abort a stream scan,
//! plus a convenience [`ScanResult`] alias. Payload decode failures are
//! deliberately absent: a row with an undecodable payload is still
//! emitted, with its extraction columns nulled.

use thiserror::Error;

/// Result alias for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can abort a stream scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A scan argument is missing, malformed, or combines mutually
    /// exclusive modes. Raised before the scan starts.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// Protobuf schema compilation or field-path resolution failed.
    /// Raised before the scan starts.
    #[error("schema error: {0}")]
    Schema(String),

    /// Connecting to the broker, creating the stream context, or fetching
    /// stream info failed. Raised on the first fetch.
    #[error("connection error: {0}")]
    Connection(String),

    /// A message fetch failed for a reason other than the sequence being
    /// absent. Absent sequences are a normal condition and never surface
    /// here.
    #[error("failed to fetch message at sequence {sequence}: {message}")]
    Fetch {
        /// The probed broker sequence.
        sequence: u64,
        /// The broker's error text.
        message: String,
    },

    /// An Arrow error propagated from batch assembly.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),
}

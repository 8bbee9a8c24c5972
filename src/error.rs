//! Error types for redblock.

use thiserror::Error;

/// Error type for redblock operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A range token could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The artifact could not be encoded or decoded
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error (metadata sidecar)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error (build config)
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Artifact bytes do not match the recorded checksum
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Artifact size differs from the size its metadata describes
    #[error("artifact is {actual} bytes, metadata describes {expected} bytes")]
    LengthMismatch { expected: usize, actual: usize },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for redblock operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for range token parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Blank or whitespace-only token
    #[error("empty range token")]
    Empty,

    /// Token is neither an IPv4 nor an IPv6 network or address
    #[error("malformed range token: {0}")]
    Malformed(String),
}

/// Error type for the binary record codec.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Stream length is not a multiple of the record size
    #[error("truncated artifact: {len} bytes is not a multiple of the {record_size}-byte record")]
    Truncated { len: usize, record_size: usize },

    /// IO error while reading or writing records
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Family tag other than 4 or 6
    #[error("invalid family tag {tag} in record {index}")]
    InvalidFamily { index: usize, tag: u32 },

    /// Record violates the interval invariants (start > end, IPv4 value out of range)
    #[error("invalid record {index}: {reason}")]
    InvalidRecord { index: usize, reason: &'static str },

    /// Interval does not fit in the chosen record layout
    #[error("interval {index} does not fit in the {layout} layout")]
    Unrepresentable { index: usize, layout: &'static str },
}

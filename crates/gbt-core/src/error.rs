//! Error types for template parsing, codecs, and node responses.

use alloc::string::String;
use thiserror::Error;

/// Errors raised by the block assembly pipeline.
///
/// Every variant describes a problem with input data. The pipeline itself
/// has no fallible internal state, so retrying with the same input always
/// yields the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MinerError {
    /// Malformed hex (odd length or a non-hex character).
    #[error("Invalid hex encoding: {0}")]
    InvalidEncoding(String),

    /// A required template field is absent.
    #[error("Missing template field: {0}")]
    MissingField(String),

    /// A template field is present but has the wrong logical type.
    #[error("Invalid type for template field: {0}")]
    InvalidFieldType(String),

    /// Compact bits with the sign bit set or an out-of-range exponent.
    #[error("Invalid compact target encoding: {0:#010x}")]
    InvalidCompactEncoding(u32),

    /// Merkle root requested over zero transactions.
    #[error("Cannot compute a merkle root over an empty transaction set")]
    EmptyTransactionSet,

    /// A fixed-size buffer had the wrong length.
    #[error("Size mismatch: expected {expected} bytes, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    /// The template's explicit target disagrees with its bits.
    #[error("Template target {target} does not match bits {bits:#010x}")]
    TargetMismatch { bits: u32, target: String },

    /// A nonce offered as a solution does not meet the header's target.
    #[error("Nonce {0} does not meet the target")]
    InvalidSolution(u32),

    /// The node returned a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    RpcFailed { code: i64, message: String },

    /// The node refused a submitted block.
    #[error("Block rejected: {0}")]
    BlockRejected(String),

    /// A node response was not valid JSON or had an unexpected shape.
    #[error("Malformed JSON: {0}")]
    Json(String),
}

impl From<hex::FromHexError> for MinerError {
    fn from(e: hex::FromHexError) -> Self {
        MinerError::InvalidEncoding(alloc::format!("{}", e))
    }
}

impl From<serde_json::Error> for MinerError {
    fn from(e: serde_json::Error) -> Self {
        MinerError::Json(alloc::format!("{}", e))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, MinerError>;

//! Integrity error types

use std::path::PathBuf;

use thiserror::Error;

/// Reasons an artifact is rejected
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("Artifact is empty")]
    Empty,

    #[error("Artifact is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("Signature is not valid base64: {0}")]
    SignatureEncoding(#[from] base64::DecodeError),

    #[error("Signature is neither 64-byte r||s nor DER")]
    SignatureFormat,

    #[error("Signature does not match artifact")]
    SignatureMismatch,

    #[error("SHA-256 mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}

impl IntegrityError {
    /// Whether the artifact bytes were well-formed but not authentic
    pub fn is_forgery(&self) -> bool {
        matches!(self, IntegrityError::SignatureMismatch | IntegrityError::HashMismatch { .. })
    }
}

/// Problems with a trust key
#[derive(Debug, Error)]
pub enum TrustError {
    #[error("Failed to read key {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed public key: {0}")]
    Malformed(String),
}

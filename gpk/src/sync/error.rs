//! Sync error types

use thiserror::Error;

use crate::integrity::IntegrityError;

/// Failure to fetch a remote document
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("Response from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },

    #[error("Unsupported URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid index document: {0}")]
    InvalidIndex(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Client(reqwest::Error),
}

impl FetchError {
    /// Whether a later cycle may succeed without any change on our side
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network { .. } => true,
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            FetchError::TooLarge { .. } => false,
            FetchError::InvalidUrl(_) => false,
            FetchError::InvalidIndex(_) => true,
            FetchError::Client(_) => false,
        }
    }
}

/// Failure of a single index entry
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("Invalid entry name {0:?}")]
    InvalidName(String),

    #[error("Malformed index entry {name}: {reason}")]
    Malformed { name: String, reason: String },

    #[error("Download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Verification failed: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Install failed: {0}")]
    Install(#[from] std::io::Error),

    #[error("Cancelled")]
    Cancelled,
}

impl EntryError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, EntryError::Integrity(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_retryable() {
        let err = FetchError::Status {
            url: "https://x".to_string(),
            status: 503,
        };
        assert!(err.is_retryable());

        let err = FetchError::Status {
            url: "https://x".to_string(),
            status: 429,
        };
        assert!(err.is_retryable());

        let err = FetchError::Status {
            url: "https://x".to_string(),
            status: 404,
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_too_large_not_retryable() {
        let err = FetchError::TooLarge {
            url: "https://x".to_string(),
            limit: 10,
        };
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Response from https://x exceeds 10 bytes");
    }

    #[test]
    fn test_entry_error_is_integrity() {
        assert!(EntryError::Integrity(IntegrityError::SignatureMismatch).is_integrity());
        assert!(!EntryError::InvalidName("..".to_string()).is_integrity());
        assert!(!EntryError::Cancelled.is_integrity());
        assert!(
            !EntryError::Malformed {
                name: "#0".to_string(),
                reason: "missing field `url`".to_string(),
            }
            .is_integrity()
        );
    }
}

//! Pack loading errors

use std::path::PathBuf;

use thiserror::Error;

use crate::integrity::IntegrityError;

/// Why a single pack file was skipped during a load
#[derive(Debug, Error)]
pub enum PackLoadError {
    #[error("No signature next to artifact (expected {0})")]
    MissingSignature(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Verification failed: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Malformed pack JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Pack has no gameId")]
    MissingGameId,
}

impl PackLoadError {
    /// The file failed verification rather than parsing
    pub fn is_integrity(&self) -> bool {
        matches!(self, PackLoadError::Integrity(_) | PackLoadError::MissingSignature(_))
    }

    /// The file was authentic but its content did not describe a pack
    pub fn is_malformed(&self) -> bool {
        matches!(self, PackLoadError::Parse(_) | PackLoadError::MissingGameId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(PackLoadError::MissingSignature(PathBuf::from("a.sig")).is_integrity());
        assert!(PackLoadError::Integrity(IntegrityError::SignatureMismatch).is_integrity());
        assert!(!PackLoadError::MissingGameId.is_integrity());

        assert!(PackLoadError::MissingGameId.is_malformed());
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(PackLoadError::from(parse).is_malformed());
    }

    #[test]
    fn test_error_display() {
        let err = PackLoadError::Integrity(IntegrityError::Empty);
        assert_eq!(err.to_string(), "Verification failed: Artifact is empty");
    }
}

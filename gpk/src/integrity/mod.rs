//! Artifact integrity
//!
//! Every pack or localization bundle is paired with a detached signature. The
//! bytes of an artifact are never parsed before [`IntegrityVerifier`] has checked
//! its size, its ECDSA P-256 / SHA-256 signature against the trust root and,
//! when a manifest is involved, its SHA-256 digest.

mod error;
mod trust;
mod verifier;

pub use error::{IntegrityError, TrustError};
pub use trust::{EMBEDDED_PUBLIC_KEY_PEM, KeySource, TrustRoot};
pub use verifier::{IntegrityVerifier, MAX_SIGNATURE_BYTES, decode_signature, hash_matches, sha256_hex, verify};

//! Signature and digest verification

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::error::IntegrityError;
use super::trust::TrustRoot;

/// Verifies artifacts against a trust root and a size ceiling
#[derive(Debug, Clone)]
pub struct IntegrityVerifier {
    trust: TrustRoot,
    max_artifact_bytes: usize,
}

impl IntegrityVerifier {
    pub fn new(trust: TrustRoot, max_artifact_bytes: usize) -> Self {
        debug!(source = ?trust.source(), %max_artifact_bytes, "IntegrityVerifier::new: called");
        Self {
            trust,
            max_artifact_bytes,
        }
    }

    pub fn trust(&self) -> &TrustRoot {
        &self.trust
    }

    pub fn max_artifact_bytes(&self) -> usize {
        self.max_artifact_bytes
    }

    /// Check `data` against its base64 detached signature
    pub fn check(&self, data: &[u8], signature_text: &[u8]) -> Result<(), IntegrityError> {
        check(data, signature_text, self.trust.key(), self.max_artifact_bytes)
    }

    /// Check the signature and additionally that `data` hashes to `expected_sha256`
    ///
    /// A validly signed artifact that is not the one the manifest announced is
    /// still rejected.
    pub fn check_with_hash(
        &self,
        data: &[u8],
        signature_text: &[u8],
        expected_sha256: &str,
    ) -> Result<(), IntegrityError> {
        self.check(data, signature_text)?;
        let actual = sha256_hex(data);
        if !hash_matches(expected_sha256, &actual) {
            debug!(%expected_sha256, %actual, "IntegrityVerifier::check_with_hash: digest mismatch");
            return Err(IntegrityError::HashMismatch {
                expected: expected_sha256.to_string(),
                actual,
            });
        }
        Ok(())
    }

    /// Boolean form of [`check`](Self::check)
    pub fn verify(&self, data: &[u8], signature_text: &[u8]) -> bool {
        self.check(data, signature_text).is_ok()
    }
}

/// Verify `data` with a base64 detached signature and a public key
///
/// Returns false for any failure, including oversize or empty input, which is
/// rejected before any cryptographic work.
pub fn verify(data: &[u8], signature_text: &[u8], key: &VerifyingKey, max_artifact_bytes: usize) -> bool {
    check(data, signature_text, key, max_artifact_bytes).is_ok()
}

/// Upper bound on a detached signature file; base64 DER P-256 signatures stay near 100 bytes
pub const MAX_SIGNATURE_BYTES: usize = 4 * 1024;

fn check(
    data: &[u8],
    signature_text: &[u8],
    key: &VerifyingKey,
    max_artifact_bytes: usize,
) -> Result<(), IntegrityError> {
    debug!(data_len = data.len(), sig_len = signature_text.len(), "check: called");
    if data.is_empty() {
        return Err(IntegrityError::Empty);
    }
    if data.len() > max_artifact_bytes {
        return Err(IntegrityError::TooLarge {
            size: data.len(),
            limit: max_artifact_bytes,
        });
    }

    let signature = decode_signature(signature_text)?;
    key.verify(data, &signature).map_err(|_| {
        debug!("check: signature mismatch");
        IntegrityError::SignatureMismatch
    })
}

/// Decode a base64 signature, fixed-width `r||s` or DER
pub fn decode_signature(signature_text: &[u8]) -> Result<Signature, IntegrityError> {
    let raw = STANDARD.decode(signature_text.trim_ascii())?;
    if raw.len() == 64 {
        return Signature::from_slice(&raw).map_err(|_| IntegrityError::SignatureFormat);
    }
    Signature::from_der(&raw).map_err(|_| IntegrityError::SignatureFormat)
}

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compare a manifest digest with a computed one
///
/// Case-insensitive and tolerant of a `0x` prefix on the manifest side.
pub fn hash_matches(expected: &str, actual_hex: &str) -> bool {
    let expected = expected.trim();
    let expected = expected
        .strip_prefix("0x")
        .or_else(|| expected.strip_prefix("0X"))
        .unwrap_or(expected);
    !expected.is_empty() && expected.eq_ignore_ascii_case(actual_hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::SigningKey;
    use p256::ecdsa::signature::Signer;

    fn signing_key() -> SigningKey {
        SigningKey::from_slice(&[0x17; 32]).unwrap()
    }

    fn sign_b64(sk: &SigningKey, data: &[u8]) -> String {
        let sig: Signature = sk.sign(data);
        STANDARD.encode(sig.to_bytes())
    }

    fn verifier(limit: usize) -> IntegrityVerifier {
        IntegrityVerifier::new(TrustRoot::from_key(signing_key().verifying_key().clone()), limit)
    }

    #[test]
    fn test_valid_signature_verifies() {
        let data = br#"{"gameId":"ArcRaiders"}"#;
        let sig = sign_b64(&signing_key(), data);
        assert!(verifier(1024).verify(data, sig.as_bytes()));
    }

    #[test]
    fn test_signature_with_whitespace_verifies() {
        let data = b"pack bytes";
        let sig = format!("  {}\r\n", sign_b64(&signing_key(), data));
        assert!(verifier(1024).verify(data, sig.as_bytes()));
    }

    #[test]
    fn test_der_signature_verifies() {
        let data = b"pack bytes";
        let sig: Signature = signing_key().sign(data);
        let der = STANDARD.encode(sig.to_der().as_bytes());
        assert!(verifier(1024).verify(data, der.as_bytes()));
    }

    #[test]
    fn test_tampered_data_rejected() {
        let sig = sign_b64(&signing_key(), b"original");
        let err = verifier(1024).check(b"tampered", sig.as_bytes()).unwrap_err();
        assert!(matches!(err, IntegrityError::SignatureMismatch));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let other = SigningKey::from_slice(&[0x29; 32]).unwrap();
        let data = b"pack bytes";
        let sig = sign_b64(&other, data);
        assert!(!verifier(1024).verify(data, sig.as_bytes()));
    }

    #[test]
    fn test_oversize_rejected_before_signature_check() {
        let data = vec![b'x'; 2048];
        // Garbage signature: size check must fail first
        let err = verifier(1024).check(&data, b"!!!").unwrap_err();
        assert!(matches!(err, IntegrityError::TooLarge { size: 2048, limit: 1024 }));
    }

    #[test]
    fn test_empty_rejected() {
        let err = verifier(1024).check(b"", b"AAAA").unwrap_err();
        assert!(matches!(err, IntegrityError::Empty));
    }

    #[test]
    fn test_bad_base64_rejected() {
        let err = verifier(1024).check(b"data", b"not base64 !!").unwrap_err();
        assert!(matches!(err, IntegrityError::SignatureEncoding(_)));
    }

    #[test]
    fn test_bad_signature_length_rejected() {
        let err = verifier(1024).check(b"data", STANDARD.encode([1u8; 10]).as_bytes()).unwrap_err();
        assert!(matches!(err, IntegrityError::SignatureFormat));
    }

    #[test]
    fn test_check_with_hash() {
        let data = b"pack bytes";
        let sig = sign_b64(&signing_key(), data);
        let v = verifier(1024);

        assert!(v.check_with_hash(data, sig.as_bytes(), &sha256_hex(data)).is_ok());

        let err = v.check_with_hash(data, sig.as_bytes(), &sha256_hex(b"other")).unwrap_err();
        assert!(matches!(err, IntegrityError::HashMismatch { .. }));
    }

    #[test]
    fn test_free_function_verify() {
        let sk = signing_key();
        let data = b"bytes";
        let sig = sign_b64(&sk, data);
        assert!(verify(data, sig.as_bytes(), sk.verifying_key(), 100));
        assert!(!verify(data, sig.as_bytes(), sk.verifying_key(), 2));
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_matches() {
        let actual = sha256_hex(b"abc");
        assert!(hash_matches(&actual, &actual));
        assert!(hash_matches(&actual.to_uppercase(), &actual));
        assert!(hash_matches(&format!("0x{}", actual), &actual));
        assert!(hash_matches(&format!(" {} ", actual), &actual));
        assert!(!hash_matches("", &actual));
        assert!(!hash_matches(&sha256_hex(b"abd"), &actual));
    }
}

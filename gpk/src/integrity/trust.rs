//! Trust root: the public key artifacts must be signed with

use std::fs;
use std::path::{Path, PathBuf};

use p256::ecdsa::VerifyingKey;
use p256::pkcs8::DecodePublicKey;
use tracing::{debug, info, warn};

use super::error::TrustError;

/// Distribution public key (P-256, SPKI PEM)
pub const EMBEDDED_PUBLIC_KEY_PEM: &str = "-----BEGIN PUBLIC KEY-----
MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEBbefaGLcV0z4kRsUrMZSDq/137WP
Y38WB/SecuXzvMZEBHaZN39g16nB/P67KHuRbAaqZ3HyE2eiWSNRdV+S0g==
-----END PUBLIC KEY-----
";

/// Where the active key came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// No override present
    Embedded,
    /// Override file loaded successfully
    Override(PathBuf),
    /// Override present but unreadable or malformed; embedded key in use
    EmbeddedFallback { path: PathBuf, reason: String },
}

/// Public key used to verify every artifact
#[derive(Debug, Clone)]
pub struct TrustRoot {
    key: VerifyingKey,
    source: KeySource,
}

impl TrustRoot {
    /// Trust root backed by the embedded distribution key
    pub fn embedded() -> Result<Self, TrustError> {
        debug!("TrustRoot::embedded: called");
        Ok(Self {
            key: parse_pem(EMBEDDED_PUBLIC_KEY_PEM)?,
            source: KeySource::Embedded,
        })
    }

    /// Trust root from a PEM string
    pub fn from_pem(pem: &str) -> Result<Self, TrustError> {
        debug!(pem_len = pem.len(), "TrustRoot::from_pem: called");
        Ok(Self {
            key: parse_pem(pem)?,
            source: KeySource::Embedded,
        })
    }

    /// Trust root from an already-parsed key
    pub fn from_key(key: VerifyingKey) -> Self {
        Self {
            key,
            source: KeySource::Embedded,
        }
    }

    /// Load the override key at `override_path`, falling back to the embedded key
    ///
    /// A missing override is the normal case and logged at debug. An override that
    /// exists but cannot be read or parsed is logged at warn and recorded in
    /// [`KeySource::EmbeddedFallback`].
    pub fn load(override_path: &Path) -> Result<Self, TrustError> {
        debug!(?override_path, "TrustRoot::load: called");
        if !override_path.exists() {
            debug!("TrustRoot::load: no override present, using embedded key");
            return Self::embedded();
        }

        let attempt = fs::read_to_string(override_path)
            .map_err(|source| TrustError::Read {
                path: override_path.to_path_buf(),
                source,
            })
            .and_then(|pem| parse_pem(&pem));

        match attempt {
            Ok(key) => {
                info!(path = %override_path.display(), "Using trust key override");
                Ok(Self {
                    key,
                    source: KeySource::Override(override_path.to_path_buf()),
                })
            }
            Err(e) => {
                warn!(path = %override_path.display(), error = %e, "Trust key override is unusable, falling back to embedded key");
                let mut root = Self::embedded()?;
                root.source = KeySource::EmbeddedFallback {
                    path: override_path.to_path_buf(),
                    reason: e.to_string(),
                };
                Ok(root)
            }
        }
    }

    pub fn key(&self) -> &VerifyingKey {
        &self.key
    }

    pub fn source(&self) -> &KeySource {
        &self.source
    }
}

fn parse_pem(pem: &str) -> Result<VerifyingKey, TrustError> {
    VerifyingKey::from_public_key_pem(pem.trim()).map_err(|e| TrustError::Malformed(e.to_string()))
}

//! On-disk artifact layout, staging and atomic install

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use super::error::EntryError;
use crate::integrity::hash_matches;

/// Extension of pack and localization bodies
pub const ARTIFACT_EXT: &str = "gpack";

/// Extension of detached signatures
pub const SIGNATURE_EXT: &str = "sig";

/// Reject names that could escape the target directory or collide with staging files
pub fn validate_name(name: &str) -> Result<(), EntryError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        debug!(%name, "validate_name: rejected");
        Err(EntryError::InvalidName(name.to_string()))
    }
}

/// `<dir>/<name>.gpack` and `<dir>/<name>.sig`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub data: PathBuf,
    pub signature: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            data: dir.join(format!("{}.{}", name, ARTIFACT_EXT)),
            signature: dir.join(format!("{}.{}", name, SIGNATURE_EXT)),
        }
    }

    /// Signature path paired with an artifact file
    pub fn for_artifact(data: &Path) -> Self {
        Self {
            data: data.to_path_buf(),
            signature: data.with_extension(SIGNATURE_EXT),
        }
    }

    /// Both files present and the artifact hashes to `expected_sha256`
    pub fn is_current(&self, expected_sha256: &str) -> bool {
        if !self.data.is_file() || !self.signature.is_file() {
            debug!(data = ?self.data, "ArtifactPaths::is_current: missing file");
            return false;
        }
        match file_sha256_hex(&self.data) {
            Ok(actual) => hash_matches(expected_sha256, &actual),
            Err(e) => {
                debug!(data = ?self.data, error = %e, "ArtifactPaths::is_current: unreadable");
                false
            }
        }
    }
}

fn file_sha256_hex(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Downloaded bytes staged next to their final location
///
/// Staged files live in the target directory so the final move is a rename on
/// the same filesystem. Dropping an uninstalled stage removes them.
pub struct StagedArtifact {
    data: NamedTempFile,
    signature: NamedTempFile,
}

impl StagedArtifact {
    pub fn stage(dir: &Path, data: &[u8], signature: &[u8]) -> io::Result<Self> {
        debug!(?dir, data_len = data.len(), "StagedArtifact::stage: called");
        fs::create_dir_all(dir)?;
        Ok(Self {
            data: write_temp(dir, data)?,
            signature: write_temp(dir, signature)?,
        })
    }

    /// Bytes of the staged artifact as written to disk
    pub fn read_data(&self) -> io::Result<Vec<u8>> {
        fs::read(self.data.path())
    }

    pub fn read_signature(&self) -> io::Result<Vec<u8>> {
        fs::read(self.signature.path())
    }

    /// Move signature then artifact into place, replacing any previous version
    pub fn install(self, paths: &ArtifactPaths) -> io::Result<()> {
        debug!(?paths, "StagedArtifact::install: called");
        self.signature.persist(&paths.signature).map_err(|e| e.error)?;
        self.data.persist(&paths.data).map_err(|e| e.error)?;
        Ok(())
    }
}

fn write_temp(dir: &Path, bytes: &[u8]) -> io::Result<NamedTempFile> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".staging-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

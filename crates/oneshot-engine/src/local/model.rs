//! Model file loading and fingerprinting.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::errors::EngineError;

/// Metadata for a loaded model file.
#[derive(Debug, Clone)]
pub(crate) struct LoadedModel {
    pub(crate) path: PathBuf,
    pub(crate) size_bytes: u64,
    pub(crate) fingerprint: String,
    pub(crate) seed: u64,
}

impl LoadedModel {
    pub(crate) fn load(path: &Path, seed: u64) -> Result<Self, EngineError> {
        let read_error = |source| EngineError::ModelRead {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(read_error)?;
        let mut hasher = Sha256::new();
        let size_bytes = io::copy(&mut file, &mut hasher).map_err(read_error)?;
        if size_bytes == 0 {
            return Err(EngineError::EmptyModel {
                path: path.to_path_buf(),
            });
        }
        let digest = hasher.finalize();
        let fingerprint = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        let prefix = digest
            .iter()
            .take(8)
            .fold(0_u64, |acc, byte| (acc << 8) | u64::from(*byte));
        Ok(Self {
            path: path.to_path_buf(),
            size_bytes,
            fingerprint,
            seed: seed ^ prefix,
        })
    }

    /// First twelve hex digits of the fingerprint.
    pub(crate) fn short_fingerprint(&self) -> &str {
        self.fingerprint.get(..12).unwrap_or(&self.fingerprint)
    }
}

//! Sources for the circuit program and the proving key

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use zkparity_compiler::codegen::keys::PROVING_KEY_B64_FILE;
use zkparity_compiler::DEFAULT_CIRCUIT_SOURCE;
use zkparity_runtime::{Result, VoteError};

/// File holding the circuit source inside an artifact directory
pub const CIRCUIT_SOURCE_FILE: &str = "circuit.zk";

pub trait ArtifactProvider {
    fn circuit_source(&self) -> Result<String>;

    /// Key blob, base64 encoded
    fn proving_key_base64(&self) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct InMemoryArtifacts {
    circuit_source: String,
    proving_key_base64: String,
}

impl InMemoryArtifacts {
    pub fn new(circuit_source: impl Into<String>, proving_key_base64: impl Into<String>) -> Self {
        Self { circuit_source: circuit_source.into(), proving_key_base64: proving_key_base64.into() }
    }

    /// Bundled circuit with the given key
    pub fn bundled(proving_key_base64: impl Into<String>) -> Self {
        Self::new(DEFAULT_CIRCUIT_SOURCE, proving_key_base64)
    }
}

impl ArtifactProvider for InMemoryArtifacts {
    fn circuit_source(&self) -> Result<String> {
        Ok(self.circuit_source.clone())
    }

    fn proving_key_base64(&self) -> Result<String> {
        Ok(self.proving_key_base64.clone())
    }
}

/// Reads artifacts from a directory written by `zkparity setup`
#[derive(Debug, Clone)]
pub struct FsArtifacts {
    dir: PathBuf,
}

impl FsArtifacts {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactProvider for FsArtifacts {
    fn circuit_source(&self) -> Result<String> {
        let path = self.dir.join(CIRCUIT_SOURCE_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "No circuit source on disk, using the bundled circuit");
            return Ok(DEFAULT_CIRCUIT_SOURCE.to_string());
        }
        Ok(fs::read_to_string(path)?)
    }

    fn proving_key_base64(&self) -> Result<String> {
        let path = self.dir.join(PROVING_KEY_B64_FILE);
        fs::read_to_string(&path).map_err(|e| {
            VoteError::proving_key(format!("cannot read {}: {}", path.display(), e))
        })
    }
}

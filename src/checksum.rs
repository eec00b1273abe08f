//! Checksums for loaded definition files

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SHA256 checksum of a definition file's contents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute a combined checksum over several checksums, in order
    pub fn combine<'a>(checksums: impl IntoIterator<Item = &'a Checksum>) -> Self {
        let mut hasher = Sha256::new();
        for checksum in checksums {
            hasher.update(checksum.0.as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Shortened form for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! Artifact checksums
//!
//! Checksums produced by this cache carry the `nix.1/` namespace so they
//! can be told apart from checksums recorded by other tools in a lockfile.

use crate::error::{FodError, FodResult};
use crate::store::{strip_namespace, HashAlgorithm, CHECKSUM_NAMESPACE};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Hex digest of an artifact plus the algorithm that produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum {
    algorithm: HashAlgorithm,
    digest: String,
    namespaced: bool,
}

impl Checksum {
    /// Parse an external checksum (`nix.1/<hex>` or bare `<hex>`)
    pub fn parse(value: &str, algorithm: HashAlgorithm) -> FodResult<Self> {
        let digest = strip_namespace(value);
        let namespaced = digest.len() != value.len();

        let invalid = |reason: String| FodError::InvalidChecksum {
            value: value.to_string(),
            reason,
        };

        if digest.len() != algorithm.hex_len() {
            return Err(invalid(format!(
                "expected {} hex characters for {}, got {}",
                algorithm.hex_len(),
                algorithm,
                digest.len()
            )));
        }
        if !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid("not a hex digest".to_string()));
        }

        Ok(Self {
            algorithm,
            digest: digest.to_ascii_lowercase(),
            namespaced,
        })
    }

    /// Checksum of the file at `path` as produced by this cache.
    ///
    /// The file is streamed through the hasher on the blocking pool.
    pub async fn compute_file(path: &Path, algorithm: HashAlgorithm) -> FodResult<Self> {
        let owned = path.to_path_buf();
        let digest = tokio::task::spawn_blocking(move || {
            File::open(&owned).and_then(|file| algorithm.hex_digest_reader(BufReader::new(file)))
        })
        .await
        .map_err(|e| FodError::Internal(format!("hashing task failed: {}", e)))?
        .map_err(|e| FodError::io(format!("hashing {}", path.display()), e))?;

        Ok(Self {
            algorithm,
            digest,
            namespaced: true,
        })
    }

    /// Checksum of in-memory `data`
    #[cfg(test)]
    pub(crate) fn compute(data: &[u8], algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            digest: algorithm.hex_digest_reader(data).unwrap(),
            namespaced: true,
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hex digest without namespace
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Whether this checksum was produced by this cache
    pub fn is_namespaced(&self) -> bool {
        self.namespaced
    }

    /// Whether both checksums describe the same content
    pub fn same_content(&self, other: &Checksum) -> bool {
        self.algorithm == other.algorithm && self.digest == other.digest
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespaced {
            f.write_str(CHECKSUM_NAMESPACE)?;
        }
        f.write_str(&self.digest)
    }
}

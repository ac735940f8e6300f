//! Fixed-output store path derivation
//!
//! Reproduces how the Nix store names a path added with
//! `nix-store --add-fixed <algo> <file>`, so the path can be known before
//! the file has even been downloaded.

use crate::error::{FodError, FodResult};
use crate::store::base32;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Namespace marking checksums computed by this cache
pub const CHECKSUM_NAMESPACE: &str = "nix.1/";

/// Maximum length of a derivation name
pub const MAX_NAME_LEN: usize = 207;

/// Substitute for names that sanitize to nothing
pub const FALLBACK_NAME: &str = "unknown";

/// Bytes in a compressed path hash (20 bytes -> 32 base32 chars)
const PATH_HASH_BYTES: usize = 20;

const DIGEST_CHUNK: usize = 64 * 1024;

/// Hash algorithm declared for a fixed-output path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    #[default]
    Sha512,
}

impl HashAlgorithm {
    /// Tag used in the derivation preimage and on the importer command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Length of a hex digest produced by this algorithm
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }

    /// Hex digest of everything `reader` yields, read in fixed-size chunks
    pub fn hex_digest_reader(&self, reader: impl Read) -> io::Result<String> {
        match self {
            Self::Sha256 => digest_reader::<Sha256>(reader),
            Self::Sha512 => digest_reader::<Sha512>(reader),
        }
    }
}

fn digest_reader<D: Digest>(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; DIGEST_CHUNK];
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = FodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(FodError::UnsupportedHashAlgorithm(other.to_string())),
        }
    }
}

/// An absolute store path `<root>/<id>-<name>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorePath(PathBuf);

impl StorePath {
    /// Parse and validate a path reported by the store.
    pub fn parse(path: &str, store_dir: &str) -> FodResult<Self> {
        let invalid = |reason: &str| FodError::InvalidStorePath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let base = path
            .strip_prefix(store_dir)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| invalid("not inside the store directory"))?;

        if base.contains('/') {
            return Err(invalid("nested below a store entry"));
        }

        let id_len = base32::encoded_len(PATH_HASH_BYTES);
        let (id, name) = match (base.get(..id_len), base.get(id_len..)) {
            (Some(id), Some(rest)) if rest.starts_with('-') && rest.len() > 1 => (id, &rest[1..]),
            _ => return Err(invalid("expected <hash>-<name>")),
        };

        base32::decode(id).map_err(|_| invalid("hash part is not base32"))?;
        if sanitize_derivation_name(name) != name {
            return Err(invalid("name contains forbidden characters"));
        }

        Ok(Self(PathBuf::from(path)))
    }

    /// The base32 hash part
    pub fn id(&self) -> &str {
        self.base_name().split_once('-').map_or("", |(id, _)| id)
    }

    /// The derivation name part
    pub fn name(&self) -> &str {
        self.base_name().split_once('-').map_or("", |(_, name)| name)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    fn base_name(&self) -> &str {
        self.0.file_name().and_then(|n| n.to_str()).unwrap_or("")
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for StorePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Remove the cache namespace from a checksum string, if present
pub fn strip_namespace(checksum: &str) -> &str {
    checksum.strip_prefix(CHECKSUM_NAMESPACE).unwrap_or(checksum)
}

/// Compute the store path `nix-store --add-fixed` assigns to a flat file.
///
/// `checksum` is the hex digest of the file under `algorithm`, optionally
/// carrying the [`CHECKSUM_NAMESPACE`] prefix. The result depends only on
/// the four inputs.
pub fn compute_fixed_output_store_path(
    name: &str,
    checksum: &str,
    algorithm: HashAlgorithm,
    store_dir: &str,
) -> StorePath {
    let checksum = strip_namespace(checksum);

    let inner = Sha256::digest(format!("fixed:out:{}:{}:", algorithm, checksum));
    let outer = Sha256::digest(format!(
        "output:out:sha256:{}:{}:{}",
        hex::encode(inner),
        store_dir,
        name
    ));

    let id = base32::encode(&base32::compress_hash(&outer, PATH_HASH_BYTES));
    StorePath(Path::new(store_dir).join(format!("{}-{}", id, name)))
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '_' | '?' | '=' | '-')
}

/// Turn an arbitrary string into a name the store accepts.
///
/// Leading dots are dropped, each run of disallowed characters becomes a
/// single `-`, and the result is cut to [`MAX_NAME_LEN`]. An empty result
/// becomes [`FALLBACK_NAME`].
pub fn sanitize_derivation_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len().min(MAX_NAME_LEN));
    let mut in_bad_run = false;

    for c in raw.trim_start_matches('.').chars() {
        if is_name_char(c) {
            name.push(c);
            in_bad_run = false;
        } else if !in_bad_run {
            name.push('-');
            in_bad_run = true;
        }
    }

    // Only ASCII survives, so byte truncation is char-safe
    name.truncate(MAX_NAME_LEN);

    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}

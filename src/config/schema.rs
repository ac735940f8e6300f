//! Configuration schema for fodcache
//!
//! Configuration is stored at `~/.config/fodcache/config.toml`

use crate::store::HashAlgorithm;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Content store settings
    pub store: StoreConfig,

    /// Archive normalization settings
    pub archiver: ArchiverConfig,

    /// Download settings
    pub network: NetworkConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Content-addressed store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store directory; must match the directory the store was built for
    pub root: String,

    /// Hash algorithm declared when importing
    pub hash_algorithm: HashAlgorithm,

    /// Program used to import files (`<importer> --add-fixed <algo> <file>`)
    pub importer: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: "/nix/store".to_string(),
            hash_algorithm: HashAlgorithm::Sha512,
            importer: "nix-store".to_string(),
        }
    }
}

/// External archiver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiverConfig {
    /// Archiver program (libarchive's bsdtar)
    pub program: String,

    /// Time zone forced on the archiver process
    pub timezone: String,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            program: "bsdtar".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

/// Download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Registry base URL for `npm:` references
    pub registry: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum fetches running at once
    pub max_concurrent: usize,

    /// Largest accepted response body
    pub max_body_bytes: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            registry: "https://registry.npmjs.org".to_string(),
            timeout_secs: 60,
            max_concurrent: 8,
            max_body_bytes: 512 * 1024 * 1024,
        }
    }
}

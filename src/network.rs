//! Artifact downloads
//!
//! Resolves a locator to a tarball URL and downloads it. A failed download
//! is retried exactly once against the other escaping of the scoped ident
//! (`@scope/name` vs `@scope%2fname`), which some registries and mirrors
//! only serve in one form.

use crate::cache::Locator;
use crate::config::schema::NetworkConfig;
use crate::error::{FodError, FodResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Fetches raw bytes from a URL
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn get(&self, url: &str) -> FodResult<Vec<u8>>;
}

/// HTTP downloader backed by a blocking `ureq` agent
#[derive(Clone)]
pub struct HttpDownloader {
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl HttpDownloader {
    pub fn new(config: &NetworkConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            max_body_bytes: config.max_body_bytes,
        }
    }

    fn get_blocking(&self, url: &str) -> FodResult<Vec<u8>> {
        let network = |reason: String| FodError::Network {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| network(e.to_string()))?;

        response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_vec()
            .map_err(|e| network(e.to_string()))
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn get(&self, url: &str) -> FodResult<Vec<u8>> {
        debug!("GET {}", url);
        let this = self.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || this.get_blocking(&url))
            .await
            .map_err(|e| FodError::Internal(format!("download task failed: {}", e)))?
    }
}

/// Resolve the tarball URL for a locator.
///
/// `npm:<version>` references map to the registry's tarball layout;
/// `http(s)://` references are used as-is.
pub fn resolve_url(locator: &Locator, registry: &str) -> FodResult<String> {
    let reference = locator.reference.as_str();

    if reference.starts_with("https://") || reference.starts_with("http://") {
        return Ok(reference.to_string());
    }

    match reference.strip_prefix("npm:") {
        Some(version) if !version.is_empty() => Ok(format!(
            "{}/{}/-/{}-{}.tgz",
            registry.trim_end_matches('/'),
            locator.ident(),
            locator.name,
            version
        )),
        _ => Err(FodError::InvalidLocator(format!(
            "{}: unsupported reference {}",
            locator, reference
        ))),
    }
}

/// The same URL with the scope separator escaped the other way, if it has one.
///
/// Only the segment right after `/@` is touched, so escapes elsewhere in a
/// direct tarball URL are left alone.
pub fn alternate_url(url: &str) -> Option<String> {
    let scope_start = url.find("/@")? + 2;
    let rest = &url[scope_start..];
    let segment_end = rest.find('/');
    let segment = &rest[..segment_end.unwrap_or(rest.len())];

    // Percent escapes are ASCII, so lowercasing keeps byte offsets
    if let Some(escape) = segment.to_ascii_lowercase().find("%2f") {
        let at = scope_start + escape;
        return Some(format!("{}/{}", &url[..at], &url[at + 3..]));
    }

    let slash = scope_start + segment_end?;
    Some(format!("{}%2f{}", &url[..slash], &url[slash + 1..]))
}

/// Download `url`, retrying a retryable failure once with [`alternate_url`]
/// (or the same URL).
pub async fn download_with_fallback(downloader: &dyn Downloader, url: &str) -> FodResult<Vec<u8>> {
    match downloader.get(url).await {
        Ok(bytes) => Ok(bytes),
        Err(first) if first.is_retryable() => {
            let retry = alternate_url(url).unwrap_or_else(|| url.to_string());
            warn!("Download failed ({}), retrying with {}", first, retry);
            downloader.get(&retry).await
        }
        Err(first) => Err(first),
    }
}

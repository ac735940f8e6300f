//! The fetch cache
//!
//! Every fetch computes the store path fresh. A known checksum lets the
//! path be predicted and probed before any download; otherwise the loader
//! runs and the path is derived from what it produced. Existence of the
//! store path is the only completion marker, and the store import is the
//! only step that writes to the store.

use crate::archive::{Archiver, NormalizedArchive};
use crate::cache::checksum::Checksum;
use crate::cache::handle::ArchiveHandle;
use crate::cache::locator::Locator;
use crate::config::Config;
use crate::error::{FodError, FodResult};
use crate::exec::{CommandRunner, SystemRunner};
use crate::network::{download_with_fallback, resolve_url, Downloader, HttpDownloader};
use crate::store::{
    compute_fixed_output_store_path, sanitize_derivation_name, HashAlgorithm, StoreImporter,
    StorePath,
};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Whether a fetch was served from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOutcome {
    /// Predicted path existed, nothing was downloaded
    Hit,
    /// The loader ran
    Miss,
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => write!(f, "hit"),
            Self::Miss => write!(f, "miss"),
        }
    }
}

/// Result of one fetch
#[derive(Debug)]
pub struct FetchResult {
    pub locator: Locator,
    pub outcome: CacheOutcome,
    pub store_path: StorePath,
    /// Checksum actually used; persist it to get hits next time
    pub checksum: Checksum,
    pub archive: ArchiveHandle,
}

/// One entry of a bulk fetch
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub locator: Locator,
    pub checksum: Option<Checksum>,
}

/// Outcome of a bulk fetch; failures do not stop other fetches
#[derive(Debug, Default)]
pub struct FetchReport {
    pub fetched: Vec<FetchResult>,
    pub failed: Vec<(Locator, FodError)>,
}

impl FetchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Derivation name for a locator's archive
pub fn derivation_name(locator: &Locator) -> String {
    sanitize_derivation_name(&format!("{}.zip", locator))
}

/// Content-addressed fetch cache in front of an external store
pub struct FetchCache {
    store_dir: String,
    algorithm: HashAlgorithm,
    registry: String,
    max_concurrent: usize,
    importer: StoreImporter,
    archiver: Archiver,
    downloader: Arc<dyn Downloader>,
}

impl FetchCache {
    /// Build a cache with explicit subprocess and download capabilities
    pub fn new(
        config: &Config,
        runner: Arc<dyn CommandRunner>,
        downloader: Arc<dyn Downloader>,
    ) -> Self {
        Self {
            store_dir: config.store.root.clone(),
            algorithm: config.store.hash_algorithm,
            registry: config.network.registry.clone(),
            max_concurrent: config.network.max_concurrent.max(1),
            importer: StoreImporter::new(
                config.store.importer.clone(),
                config.store.root.clone(),
                runner.clone(),
            ),
            archiver: Archiver::new(&config.archiver, runner),
            downloader,
        }
    }

    /// Build a cache that runs real processes and real HTTP requests
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config,
            Arc::new(SystemRunner),
            Arc::new(HttpDownloader::new(&config.network)),
        )
    }

    /// Store path for `name` holding content with `checksum`
    pub fn predict(&self, name: &str, checksum: &Checksum) -> StorePath {
        compute_fixed_output_store_path(
            name,
            checksum.digest(),
            checksum.algorithm(),
            &self.store_dir,
        )
    }

    async fn exists(&self, path: &StorePath) -> FodResult<bool> {
        let found = tokio::fs::try_exists(path)
            .await
            .map_err(|e| FodError::io(format!("checking {}", path), e))?;
        debug!("Probed {}: {}", path, if found { "present" } else { "absent" });
        Ok(found)
    }

    /// Fetch an artifact through the cache.
    ///
    /// With an `expected` checksum whose store path exists, `loader` is not
    /// called. Otherwise `loader` produces a normalized archive which is
    /// hashed and imported unless its path appeared in the meantime.
    pub async fn fetch<F, Fut>(
        &self,
        locator: &Locator,
        expected: Option<&Checksum>,
        loader: F,
    ) -> FodResult<FetchResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FodResult<NormalizedArchive>>,
    {
        let name = derivation_name(locator);

        if let Some(expected) = expected {
            let predicted = self.predict(&name, expected);
            if self.exists(&predicted).await? {
                info!("Cache hit for {}", locator);
                return self
                    .finish(locator, CacheOutcome::Hit, predicted, expected.clone())
                    .await;
            }
        }

        info!("Cache miss for {}", locator);
        let mut artifact = loader().await?;
        let checksum = Checksum::compute_file(artifact.path(), self.algorithm).await?;
        if let Some(expected) = expected.filter(|e| !e.same_content(&checksum)) {
            info!("Recorded checksum {} for {} is stale", expected, locator);
        }
        let store_path = self.predict(&name, &checksum);

        if self.exists(&store_path).await? {
            debug!("{} already imported, discarding download", store_path);
        } else {
            artifact.rename(&name).await?;
            let imported = self
                .importer
                .add_fixed(self.algorithm, artifact.path())
                .await?;
            if imported != store_path {
                return Err(FodError::StorePathMismatch {
                    expected: store_path.as_path().to_path_buf(),
                    actual: imported.as_path().to_path_buf(),
                });
            }
        }
        drop(artifact);

        self.finish(locator, CacheOutcome::Miss, store_path, checksum)
            .await
    }

    async fn finish(
        &self,
        locator: &Locator,
        outcome: CacheOutcome,
        store_path: StorePath,
        checksum: Checksum,
    ) -> FodResult<FetchResult> {
        let archive = ArchiveHandle::open_async(store_path.as_path().to_path_buf()).await?;
        Ok(FetchResult {
            locator: locator.clone(),
            outcome,
            store_path,
            checksum,
            archive,
        })
    }

    /// Default loader: download the locator's tarball and normalize it
    pub async fn download(&self, locator: &Locator) -> FodResult<NormalizedArchive> {
        let url = resolve_url(locator, &self.registry)?;
        let raw = download_with_fallback(self.downloader.as_ref(), &url).await?;
        debug!("Downloaded {} bytes for {}", raw.len(), locator);
        self.archiver.normalize(&raw).await
    }

    /// Fetch many artifacts concurrently with the download loader
    pub async fn fetch_all(&self, requests: Vec<FetchRequest>) -> FetchReport {
        let results: Vec<(Locator, FodResult<FetchResult>)> = stream::iter(requests)
            .map(|request| async move {
                let result = self
                    .fetch(&request.locator, request.checksum.as_ref(), || {
                        self.download(&request.locator)
                    })
                    .await;
                (request.locator, result)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut report = FetchReport::default();
        for (locator, result) in results {
            match result {
                Ok(fetched) => report.fetched.push(fetched),
                Err(e) => report.failed.push((locator, e)),
            }
        }
        report
    }
}

//! Read-only access to fetched archives

use crate::error::{FodError, FodResult};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// An open, read-only archive in the store
pub struct ArchiveHandle {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl ArchiveHandle {
    /// Open the zip at `path` read-only
    pub fn open(path: &Path) -> FodResult<Self> {
        let file = File::open(path)
            .map_err(|e| FodError::io(format!("opening {}", path.display()), e))?;
        let archive = ZipArchive::new(file)?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    /// Open on the blocking pool, for use from async code
    pub async fn open_async(path: PathBuf) -> FodResult<Self> {
        tokio::task::spawn_blocking(move || Self::open(&path))
            .await
            .map_err(|e| FodError::Internal(format!("opening archive failed: {}", e)))?
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries in the archive
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry names in archive order
    pub fn entries(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Read one entry into memory
    pub fn read(&mut self, name: &str) -> FodResult<Vec<u8>> {
        let mut entry = self.archive.by_name(name)?;
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut buf)
            .map_err(|e| FodError::io(format!("reading {} from {}", name, self.path.display()), e))?;
        Ok(buf)
    }

    /// Close the archive
    pub fn release(self) {}
}

impl std::fmt::Debug for ArchiveHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveHandle")
            .field("path", &self.path)
            .field("entries", &self.archive.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::zip_with;
    use tempfile::TempDir;

    #[test]
    fn open_and_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.zip");
        std::fs::write(&path, zip_with("package/index.js", b"42")).unwrap();

        let mut handle = ArchiveHandle::open(&path).unwrap();
        assert_eq!(handle.len(), 1);
        assert_eq!(handle.entries(), vec!["package/index.js".to_string()]);
        assert_eq!(handle.read("package/index.js").unwrap(), b"42");
        assert!(handle.read("missing").is_err());
        handle.release();
    }

    #[tokio::test]
    async fn open_async_reads_entries() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.zip");
        std::fs::write(&path, zip_with("package/index.js", b"42")).unwrap();

        let mut handle = ArchiveHandle::open_async(path.clone()).await.unwrap();
        assert_eq!(handle.path(), path);
        assert!(!handle.is_empty());
        assert_eq!(handle.read("package/index.js").unwrap(), b"42");

        let err = ArchiveHandle::open_async(temp.path().join("nope.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, FodError::Io { .. }));
    }

    #[test]
    fn non_zip_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.zip");
        std::fs::write(&path, b"definitely not a zip").unwrap();
        assert!(matches!(ArchiveHandle::open(&path), Err(FodError::Archive(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = ArchiveHandle::open(&temp.path().join("nope.zip")).unwrap_err();
        assert!(matches!(err, FodError::Io { .. }));
    }
}

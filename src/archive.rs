//! Archive normalization
//!
//! Registries serve gzipped tarballs whose bytes depend on when and how
//! they were packed. Repacking them into a zip with a fixed input mtime and
//! a fixed time zone gives a byte stream that only depends on the upstream
//! content, which makes its hash (and therefore its store path) stable.

use crate::config::schema::ArchiverConfig;
use crate::error::{FodError, FodResult};
use crate::exec::{run_checked, CommandRunner, CommandSpec};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tracing::debug;

/// Modification time forced onto the downloaded file (1984-06-22)
pub const SENTINEL_MTIME_SECS: u64 = 456_789_000;

const SOURCE_FILE: &str = "source.tgz";
const OUTPUT_FILE: &str = "archive.zip";

/// A normalized archive alone in its own temporary directory.
///
/// Dropping it deletes the directory and everything in it.
#[derive(Debug)]
pub struct NormalizedArchive {
    dir: TempDir,
    path: PathBuf,
}

impl NormalizedArchive {
    /// Take ownership of `path`, which must be the only entry of `dir`
    pub fn new(dir: TempDir, path: PathBuf) -> Self {
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub(crate) fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Rename the archive to `file_name` inside its directory.
    ///
    /// The directory is exclusively owned, so the new name cannot collide.
    pub async fn rename(&mut self, file_name: &str) -> FodResult<()> {
        let target = self.dir.path().join(file_name);
        if target == self.path {
            return Ok(());
        }
        tokio::fs::rename(&self.path, &target)
            .await
            .map_err(|e| FodError::io(format!("renaming {}", self.path.display()), e))?;
        self.path = target;
        Ok(())
    }
}

/// Repacks downloaded archives into deterministic zips with an external tool
pub struct Archiver {
    program: String,
    timezone: String,
    runner: Arc<dyn CommandRunner>,
}

impl Archiver {
    /// Build the archiver once from configuration
    pub fn new(config: &ArchiverConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            program: config.program.clone(),
            timezone: config.timezone.clone(),
            runner,
        }
    }

    /// Command line that repacks `input` into a zip at `output`
    fn repack_command(&self, input: &Path, output: &Path) -> CommandSpec {
        let mut source = OsString::from("@");
        source.push(input);

        CommandSpec::new(&self.program)
            .arg("--format")
            .arg("zip")
            .arg("-cf")
            .arg(output)
            .arg(source)
            .env("TZ", &self.timezone)
    }

    /// Normalize raw archive bytes into a zip in a fresh temporary directory.
    pub async fn normalize(&self, raw: &[u8]) -> FodResult<NormalizedArchive> {
        let dir = tempfile::Builder::new()
            .prefix("fodcache-")
            .tempdir()
            .map_err(|e| FodError::io("creating temporary directory", e))?;

        let input = dir.path().join(SOURCE_FILE);
        let output = dir.path().join(OUTPUT_FILE);

        write_with_sentinel_mtime(&input, raw).await?;

        let spec = self.repack_command(&input, &output);
        debug!("Normalizing {} bytes with {}", raw.len(), self.program);
        run_checked(self.runner.as_ref(), &spec).await?;

        tokio::fs::remove_file(&input)
            .await
            .map_err(|e| FodError::io(format!("removing {}", input.display()), e))?;

        if !tokio::fs::try_exists(&output)
            .await
            .map_err(|e| FodError::io(format!("checking {}", output.display()), e))?
        {
            return Err(FodError::ArchiverOutputMissing(output));
        }

        ensure_sole_entry(dir.path(), &output).await?;
        Ok(NormalizedArchive::new(dir, output))
    }
}

async fn write_with_sentinel_mtime(path: &Path, data: &[u8]) -> FodResult<()> {
    let context = || format!("writing {}", path.display());

    tokio::fs::write(path, data)
        .await
        .map_err(|e| FodError::io(context(), e))?;

    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .await
        .map_err(|e| FodError::io(context(), e))?
        .into_std()
        .await;

    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(SENTINEL_MTIME_SECS);
    tokio::task::spawn_blocking(move || file.set_modified(mtime))
        .await
        .map_err(|e| FodError::Internal(format!("setting mtime failed: {}", e)))?
        .map_err(|e| FodError::io(context(), e))
}

async fn ensure_sole_entry(dir: &Path, expected: &Path) -> FodResult<()> {
    let listing = |e: std::io::Error| FodError::io(format!("listing {}", dir.display()), e);

    let mut reader = tokio::fs::read_dir(dir).await.map_err(listing)?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(listing)? {
        entries.push(entry.path());
    }

    match entries.as_slice() {
        [only] if only == expected => Ok(()),
        _ => Err(FodError::Internal(format!(
            "archiver left {} entries in {}",
            entries.len(),
            dir.display()
        ))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::exec::{CommandOutput, SystemRunner};
    use async_trait::async_trait;
    use std::fs;
    use std::io::{Cursor, Read, Write};
    use std::sync::Mutex;

    /// Build a zip holding a single file, with fixed entry timestamps
    pub(crate) fn zip_with(name: &str, contents: &[u8]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents).unwrap();
        writer.finish().unwrap().into_inner()
    }

    /// Stands in for bsdtar: wraps the input bytes and their mtime in a zip
    #[derive(Default)]
    pub(crate) struct FakeArchiver {
        pub(crate) calls: Mutex<Vec<CommandSpec>>,
    }

    #[async_trait]
    impl CommandRunner for FakeArchiver {
        async fn run(&self, spec: &CommandSpec) -> FodResult<CommandOutput> {
            self.calls.lock().unwrap().push(spec.clone());

            let output = PathBuf::from(&spec.args[3]);
            let input = spec.args[4].to_string_lossy();
            let input = input.strip_prefix('@').unwrap();

            let mut body = fs::read(input).unwrap();
            let mtime = fs::metadata(input)
                .unwrap()
                .modified()
                .unwrap()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap()
                .as_secs();
            body.extend_from_slice(mtime.to_string().as_bytes());
            fs::write(output, zip_with("package/contents", &body)).unwrap();

            Ok(CommandOutput {
                code: Some(0),
                ..Default::default()
            })
        }
    }

    struct FailingArchiver {
        code: i32,
    }

    #[async_trait]
    impl CommandRunner for FailingArchiver {
        async fn run(&self, _spec: &CommandSpec) -> FodResult<CommandOutput> {
            Ok(CommandOutput {
                code: Some(self.code),
                stdout: String::new(),
                stderr: "bsdtar: Unrecognized archive format".to_string(),
            })
        }
    }

    fn archiver(runner: Arc<dyn CommandRunner>) -> Archiver {
        Archiver::new(&ArchiverConfig::default(), runner)
    }

    #[tokio::test]
    async fn normalize_leaves_single_zip() {
        let runner = Arc::new(FakeArchiver::default());
        let normalized = archiver(runner.clone())
            .normalize(b"raw tarball")
            .await
            .unwrap();

        assert_eq!(normalized.path().file_name().unwrap(), OUTPUT_FILE);
        let entries: Vec<_> = fs::read_dir(normalized.dir()).unwrap().collect();
        assert_eq!(entries.len(), 1);

        let calls = runner.calls.lock().unwrap();
        let spec = &calls[0];
        assert_eq!(spec.program, "bsdtar");
        assert_eq!(spec.args[0], "--format");
        assert_eq!(spec.args[1], "zip");
        assert_eq!(spec.env, vec![("TZ".to_string(), "UTC".to_string())]);
    }

    #[tokio::test]
    async fn input_carries_sentinel_mtime() {
        let runner = Arc::new(FakeArchiver::default());
        let normalized = archiver(runner).normalize(b"abc").await.unwrap();

        let mut archive = zip::ZipArchive::new(fs::File::open(normalized.path()).unwrap()).unwrap();
        let mut body = String::new();
        archive
            .by_name("package/contents")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, format!("abc{}", SENTINEL_MTIME_SECS));
    }

    #[tokio::test]
    async fn normalization_is_deterministic() {
        let runner: Arc<dyn CommandRunner> = Arc::new(FakeArchiver::default());
        let first = archiver(runner.clone()).normalize(b"same bytes").await.unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        let second = archiver(runner).normalize(b"same bytes").await.unwrap();

        assert_ne!(first.dir(), second.dir());
        assert_eq!(fs::read(first.path()).unwrap(), fs::read(second.path()).unwrap());
    }

    #[tokio::test]
    async fn dropping_removes_directory() {
        let normalized = archiver(Arc::new(FakeArchiver::default()))
            .normalize(b"x")
            .await
            .unwrap();
        let dir = normalized.dir().to_path_buf();
        drop(normalized);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn rename_stays_in_directory() {
        let mut normalized = archiver(Arc::new(FakeArchiver::default()))
            .normalize(b"x")
            .await
            .unwrap();
        normalized.rename("left-pad-npm-1.3.0.zip").await.unwrap();
        assert_eq!(normalized.path(), normalized.dir().join("left-pad-npm-1.3.0.zip"));
        assert!(normalized.path().exists());
    }

    #[tokio::test]
    async fn archiver_failure_is_subprocess_error() {
        let err = archiver(Arc::new(FailingArchiver { code: 1 }))
            .normalize(b"not an archive")
            .await
            .unwrap_err();
        assert!(matches!(err, FodError::Subprocess { code: Some(1), .. }));
    }

    #[tokio::test]
    async fn missing_output_is_reported() {
        let err = archiver(Arc::new(FailingArchiver { code: 0 }))
            .normalize(b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, FodError::ArchiverOutputMissing(_)));
    }

    async fn bsdtar_available() -> bool {
        SystemRunner
            .run(&CommandSpec::new("bsdtar").arg("--version"))
            .await
            .map(|out| out.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn real_bsdtar_is_deterministic() {
        if !bsdtar_available().await {
            return;
        }

        let raw = zip_with("package/index.js", b"module.exports = 42;\n");
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
        let first = archiver(runner.clone()).normalize(&raw).await.unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        let second = archiver(runner).normalize(&raw).await.unwrap();

        assert_eq!(fs::read(first.path()).unwrap(), fs::read(second.path()).unwrap());
    }
}

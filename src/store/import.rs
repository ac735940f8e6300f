//! Import of flat files into the external store

use crate::error::{FodError, FodResult};
use crate::exec::{run_checked, CommandRunner, CommandSpec};
use crate::store::path::{HashAlgorithm, StorePath};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Adds files to the store as fixed-output content
pub struct StoreImporter {
    program: String,
    store_dir: String,
    runner: Arc<dyn CommandRunner>,
}

impl StoreImporter {
    /// Create an importer invoking `program` (normally `nix-store`)
    pub fn new(
        program: impl Into<String>,
        store_dir: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            program: program.into(),
            store_dir: store_dir.into(),
            runner,
        }
    }

    /// Run `<program> --add-fixed <algo> <file>` and return the reported path.
    ///
    /// The file's base name becomes the name part of the store path.
    pub async fn add_fixed(&self, algorithm: HashAlgorithm, file: &Path) -> FodResult<StorePath> {
        let spec = CommandSpec::new(&self.program)
            .arg("--add-fixed")
            .arg(algorithm.as_str())
            .arg(file);

        debug!("Importing {} into {}", file.display(), self.store_dir);
        let stdout = run_checked(self.runner.as_ref(), &spec).await?;

        let reported = stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| FodError::ImportOutputMissing {
                command: spec.to_string(),
            })?;

        let path = StorePath::parse(reported, &self.store_dir)?;
        info!("Imported {}", path);
        Ok(path)
    }
}

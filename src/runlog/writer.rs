//! Run log writer - persists [`RunLog`] records under the repository root

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{find_repo_root, RunLog};
use crate::Result;

/// Default run log directory, relative to the repository root
pub const DEFAULT_RUNS_DIR: &str = "metadata/runs";

/// Writes run logs to `<root>/<dir>/<prefix>_<timestamp>.json`.
///
/// Two writes of the same prefix within one second share a file name; the
/// later one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLogWriter {
    repo_root: PathBuf,
    dir: PathBuf,
    prefix: Option<String>,
}

impl RunLogWriter {
    /// Writer rooted at `repo_root`, writing to `metadata/runs`.
    #[must_use]
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            dir: PathBuf::from(DEFAULT_RUNS_DIR),
            prefix: None,
        }
    }

    /// Writer rooted at the repository containing the working directory.
    ///
    /// # Errors
    /// Returns an IO error if the working directory cannot be read.
    pub fn from_current_dir() -> Result<Self> {
        Ok(Self::new(find_repo_root(std::env::current_dir()?)))
    }

    /// Write under `dir` (relative to the root) instead of `metadata/runs`.
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Use `prefix` instead of the stage name in file names.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Repository root this writer targets
    #[must_use]
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Record `payload` for `stage` and return the written path.
    ///
    /// # Errors
    /// Returns an IO or JSON error if the log cannot be written.
    pub fn write(&self, stage: &str, payload: Value) -> Result<PathBuf> {
        self.write_record(&RunLog::new(stage, payload))
    }

    /// Persist an already built record.
    ///
    /// # Errors
    /// Returns an IO or JSON error if the log cannot be written.
    pub fn write_record(&self, log: &RunLog) -> Result<PathBuf> {
        let dir = self.repo_root.join(&self.dir);
        std::fs::create_dir_all(&dir)?;

        let prefix = self.prefix.as_deref().unwrap_or(log.stage());
        let path = dir.join(log.file_name(prefix));
        std::fs::write(&path, serde_json::to_string_pretty(log)?)?;

        tracing::info!(stage = log.stage(), path = %path.display(), "run log written");
        Ok(path)
    }
}

/// Write a run log for `stage` under the current repository root.
///
/// # Errors
/// Returns an IO or JSON error if the log cannot be written.
pub fn write_log(stage: &str, payload: Value) -> Result<PathBuf> {
    RunLogWriter::from_current_dir()?.write(stage, payload)
}

//! Pipeline provenance
//!
//! Each pipeline stage leaves a small JSON record behind so a result can be
//! traced back to when and how it was produced:
//!
//! ```text
//! <repo>/metadata/runs/<prefix>_<YYYYMMDDTHHMMSSZ>.json
//! {
//!   "stage": "sustainability_eval",
//!   "timestamp_utc": "2024-01-01T00:00:00Z",
//!   "env": {"crate_version": "...", "os": "linux", "arch": "x86_64"},
//!   "payload": { ... }
//! }
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ecoproxy::runlog::RunLogWriter;
//! use serde_json::json;
//!
//! # fn main() -> ecoproxy::Result<()> {
//! let path = RunLogWriter::from_current_dir()?
//!     .write("sustainability_eval", json!({"metrics": ["co2", "mci"]}))?;
//! println!("logged to {}", path.display());
//! # Ok(())
//! # }
//! ```

mod record;
mod writer;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

pub use record::{EnvInfo, RunLog};
pub use writer::{write_log, RunLogWriter, DEFAULT_RUNS_DIR};

/// Default pipeline config location, relative to the repository root
pub const DEFAULT_PIPELINE_CONFIG: &str = "metadata/pipeline_config.json";

const HASH_CHUNK_BYTES: usize = 1024 * 1024;

/// Walk up from `start` to the first directory containing `.git`.
///
/// Falls back to `start` itself when no ancestor is a repository.
#[must_use]
pub fn find_repo_root(start: impl AsRef<Path>) -> PathBuf {
    let start = start.as_ref();
    let resolved = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    resolved
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map_or_else(|| start.to_path_buf(), Path::to_path_buf)
}

/// Read `<repo_root>/<rel_path>` as JSON.
///
/// # Errors
/// [`Error::FileNotFound`] if the file is missing, [`Error::Json`] if it does
/// not parse.
pub fn load_pipeline_config(repo_root: impl AsRef<Path>, rel_path: &str) -> Result<Value> {
    let path = repo_root.as_ref().join(rel_path);
    if !path.exists() {
        return Err(Error::FileNotFound(path));
    }
    let text = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Hex SHA-256 of a file, streamed in 1 MiB chunks.
///
/// # Errors
/// Returns an IO error if the file cannot be read.
pub fn sha256_file(path: impl AsRef<Path>) -> Result<String> {
    let mut file = File::open(path.as_ref())?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_BYTES];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

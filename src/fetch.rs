//! Dataset download from Zenodo records, with a local file cache.
//!
//! The network path needs the `fetch` feature (blocking `reqwest`). Without
//! it, cached files still load and a cache miss is a [`Error::FetchError`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use arrow::record_batch::RecordBatch;

use crate::storage::load_csv;
use crate::{Error, Result};

/// Public Zenodo instance
pub const DEFAULT_BASE_URL: &str = "https://zenodo.org";

/// Download URL of `filename` in record `record_id` on `base_url`.
///
/// ```
/// use ecoproxy::fetch::{download_url, DEFAULT_BASE_URL};
///
/// assert_eq!(
///     download_url(DEFAULT_BASE_URL, "16256961", "raw_data.csv"),
///     "https://zenodo.org/records/16256961/files/raw_data.csv?download=1"
/// );
/// ```
#[must_use]
pub fn download_url(base_url: &str, record_id: &str, filename: &str) -> String {
    format!(
        "{}/records/{record_id}/files/{filename}?download=1",
        base_url.trim_end_matches('/')
    )
}

/// Fetches record files into a destination folder and loads them as tables.
///
/// A file already present in the folder is used as is. There are no retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFetcher {
    dest_dir: PathBuf,
    base_url: String,
    timeout: Duration,
}

impl DatasetFetcher {
    /// Fetcher caching into `dest_dir` (default timeout 60s).
    #[must_use]
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Point at another Zenodo-compatible host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cache folder
    #[must_use]
    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Request timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Local path a record file is cached at
    #[must_use]
    pub fn local_path(&self, filename: &str) -> PathBuf {
        self.dest_dir.join(filename)
    }

    /// Make sure `filename` is cached locally, downloading it on a miss.
    ///
    /// # Errors
    /// [`Error::FetchError`] if the download fails or returns a non-success
    /// status, IO errors if the file cannot be written.
    pub fn ensure_local(&self, record_id: &str, filename: &str) -> Result<PathBuf> {
        let path = self.local_path(filename);
        if path.exists() {
            tracing::info!(path = %path.display(), "using cached dataset");
            return Ok(path);
        }

        std::fs::create_dir_all(&self.dest_dir)?;
        let url = download_url(&self.base_url, record_id, filename);
        tracing::info!(%url, record_id, filename, "downloading dataset");
        let bytes = self.download(&url)?;

        let partial = partial_path(&path);
        std::fs::write(&partial, &bytes)?;
        std::fs::rename(&partial, &path)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "dataset saved");
        Ok(path)
    }

    /// Fetch `filename` from `record_id` and load it as CSV.
    ///
    /// # Errors
    /// As [`DatasetFetcher::ensure_local`], plus [`Error::StorageError`] if
    /// the file is not valid CSV.
    pub fn fetch(&self, record_id: &str, filename: &str) -> Result<RecordBatch> {
        let path = self.ensure_local(record_id, filename)?;
        load_csv(path)
    }

    #[cfg(feature = "fetch")]
    fn download(&self, url: &str) -> Result<Vec<u8>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::FetchError(e.to_string()))?;

        let response = client
            .get(url)
            .send()
            .map_err(|e| Error::FetchError(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::FetchError(format!(
                "failed to download file: {status} - {body}"
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| Error::FetchError(format!("reading body from {url} failed: {e}")))?;
        Ok(bytes.to_vec())
    }

    #[cfg(not(feature = "fetch"))]
    #[allow(clippy::unused_self)]
    fn download(&self, url: &str) -> Result<Vec<u8>> {
        Err(Error::FetchError(format!(
            "cannot download {url}: built without the `fetch` feature"
        )))
    }
}

/// `<path>.part`, keeping the full file name.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

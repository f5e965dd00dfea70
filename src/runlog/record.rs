//! Run log record - one pipeline stage execution

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Build environment a stage ran under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvInfo {
    /// Version of this crate
    pub crate_version: String,
    /// Target operating system (`linux`, `macos`, ...)
    pub os: String,
    /// Target architecture (`x86_64`, `aarch64`, ...)
    pub arch: String,
}

impl EnvInfo {
    /// Describe the current build.
    #[must_use]
    pub fn current() -> Self {
        Self {
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

/// A compact record of one pipeline stage, written as pretty JSON.
///
/// Example stages: `download_store`, `prepare_data`, `train_optimize`,
/// `sustainability_eval`, `scenario_analysis`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunLog {
    stage: String,
    timestamp_utc: DateTime<Utc>,
    env: EnvInfo,
    payload: Value,
}

impl RunLog {
    /// Create a record stamped with the current time (whole seconds).
    #[must_use]
    pub fn new(stage: impl Into<String>, payload: Value) -> Self {
        Self::at(stage, payload, Utc::now().trunc_subsecs(0))
    }

    /// Create a record with an explicit timestamp.
    #[must_use]
    pub fn at(stage: impl Into<String>, payload: Value, timestamp_utc: DateTime<Utc>) -> Self {
        Self {
            stage: stage.into(),
            timestamp_utc,
            env: EnvInfo::current(),
            payload,
        }
    }

    /// Get the stage name.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Get the timestamp.
    #[must_use]
    pub const fn timestamp_utc(&self) -> DateTime<Utc> {
        self.timestamp_utc
    }

    /// Get the environment record.
    #[must_use]
    pub const fn env(&self) -> &EnvInfo {
        &self.env
    }

    /// Get the stage payload.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// File name for this record: `<prefix>_<YYYYMMDDTHHMMSSZ>.json`.
    #[must_use]
    pub fn file_name(&self, prefix: &str) -> String {
        format!("{prefix}_{}.json", self.timestamp_utc.format("%Y%m%dT%H%M%SZ"))
    }
}

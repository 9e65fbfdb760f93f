//! Configuration types for lecture-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Remote service configuration (endpoints, paging, throttling)
///
/// Groups settings for the rate-limited remote client.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote service (default: "https://www.udemy.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Maximum curriculum items fetched in a single page (default: 1000)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Lower bound of the randomized pre-request delay in milliseconds (default: 500)
    ///
    /// Every remote call waits a uniformly random amount of time inside
    /// `[throttle_min_ms, throttle_max_ms]` before being sent. This is a
    /// deliberate throttle to avoid tripping abuse protection, not a
    /// retry/backoff mechanism.
    #[serde(default = "default_throttle_min_ms")]
    pub throttle_min_ms: u64,

    /// Upper bound of the randomized pre-request delay in milliseconds (default: 1000)
    #[serde(default = "default_throttle_max_ms")]
    pub throttle_max_ms: u64,

    /// HTTP request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            throttle_min_ms: default_throttle_min_ms(),
            throttle_max_ms: default_throttle_max_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Archive output configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Directory the finished archive is delivered into (default: "./downloads")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Deflate compression level, 0-9 (default: 6)
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            compression_level: default_compression_level(),
        }
    }
}

/// Persistence configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path to the SQLite database holding the run state (default: "./lecture-dl.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Top-level configuration for [`TranscriptDownloader`](crate::TranscriptDownloader)
///
/// Every field has a sensible default; `Config::default()` works out of
/// the box against the real service.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Archive output settings
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Persistence settings
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Validate the configuration
    ///
    /// Checks the settings that would otherwise only fail deep inside a
    /// run: the base URL must parse, the throttle window must not be
    /// inverted, and the compression level must be a valid Deflate level.
    pub fn validate(&self) -> Result<()> {
        if url::Url::parse(&self.remote.base_url).is_err() {
            return Err(Error::Config {
                message: format!("invalid base URL '{}'", self.remote.base_url),
                key: Some("remote.base_url".to_string()),
            });
        }

        if self.remote.throttle_min_ms > self.remote.throttle_max_ms {
            return Err(Error::Config {
                message: format!(
                    "throttle_min_ms ({}) must not exceed throttle_max_ms ({})",
                    self.remote.throttle_min_ms, self.remote.throttle_max_ms
                ),
                key: Some("remote.throttle_min_ms".to_string()),
            });
        }

        if !(0..=9).contains(&self.archive.compression_level) {
            return Err(Error::Config {
                message: format!(
                    "compression_level must be between 0 and 9, got {}",
                    self.archive.compression_level
                ),
                key: Some("archive.compression_level".to_string()),
            });
        }

        Ok(())
    }
}

fn default_base_url() -> String {
    "https://www.udemy.com".to_string()
}

fn default_page_size() -> u32 {
    1000
}

fn default_throttle_min_ms() -> u64 {
    500
}

fn default_throttle_max_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_compression_level() -> i32 {
    6
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./lecture-dl.db")
}

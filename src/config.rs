use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::DownloadError;

/// Number of PDFs a test-mode run stops at
pub const TEST_MODE_DOWNLOAD_LIMIT: usize = 2;

pub const DEFAULT_BASE_URL: &str = "https://www.tctmd.com";
pub const DEFAULT_LOG_FILE: &str = "pdf_downloader.log";

/// Settings for a download run, loadable from a JSON file and overridable from the CLI
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Site root, e.g. https://www.tctmd.com
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Directory the PDFs are written to
    pub output_dir: PathBuf,
    /// Stop after `TEST_MODE_DOWNLOAD_LIMIT` PDFs
    pub test_mode: bool,
    /// Cap on PDFs per run outside test mode
    pub max_downloads: Option<usize>,
    /// Last search results page to look at
    pub max_pages: usize,
    pub page_size: usize,
    /// Attempts per PDF
    pub retry_count: u32,
    /// Base of the exponential sleep between attempts after a transport error
    pub retry_base_delay_ms: u64,
    /// Pause after each successful download
    pub download_delay_ms: u64,
    /// Pause before checking that the login took
    pub login_settle_delay_ms: u64,
    /// Hops allowed while following the single sign-on redirect chain
    pub max_redirects: usize,
    pub timeout_secs: u64,
    pub log_file: PathBuf,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: String::new(),
            password: String::new(),
            output_dir: PathBuf::from("downloads"),
            test_mode: false,
            max_downloads: None,
            max_pages: 50,
            page_size: 12,
            retry_count: 3,
            retry_base_delay_ms: 1000,
            download_delay_ms: 1000,
            login_settle_delay_ms: 2000,
            max_redirects: 5,
            timeout_secs: 60,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl DownloaderConfig {
    /// Load settings from a JSON file; missing keys fall back to defaults
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, DownloadError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| DownloadError::ConfigError(format!("Cannot open {}: {}", path.display(), e)))?;

        serde_json::from_reader(file)
            .map_err(|e| DownloadError::ConfigError(format!("Cannot parse {}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.username.trim().is_empty() {
            return Err(DownloadError::ConfigError(String::from("username is required")));
        }
        if self.password.is_empty() {
            return Err(DownloadError::ConfigError(String::from("password is required")));
        }

        let base = self.base_url()?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(DownloadError::ConfigError(format!(
                "base_url must be http or https, got {}",
                base.scheme()
            )));
        }

        if self.page_size == 0 {
            return Err(DownloadError::ConfigError(String::from("page_size must be at least 1")));
        }
        if self.retry_count == 0 {
            return Err(DownloadError::ConfigError(String::from("retry_count must be at least 1")));
        }
        if self.max_redirects == 0 {
            return Err(DownloadError::ConfigError(String::from("max_redirects must be at least 1")));
        }
        if self.timeout_secs == 0 {
            return Err(DownloadError::ConfigError(String::from("timeout_secs must be at least 1")));
        }

        Ok(())
    }

    pub fn base_url(&self) -> Result<reqwest::Url, DownloadError> {
        reqwest::Url::parse(&self.base_url)
            .map_err(|e| DownloadError::ConfigError(format!("Invalid base_url '{}': {}", self.base_url, e)))
    }

    pub fn login_url(&self) -> String {
        format!("{}/api/v1/user/login", self.base_url.trim_end_matches('/'))
    }

    pub fn search_url(&self) -> String {
        format!("{}/search", self.base_url.trim_end_matches('/'))
    }

    /// How many PDFs this run may produce. Test mode wins over `max_downloads`.
    pub fn download_limit(&self) -> Option<usize> {
        if self.test_mode {
            Some(TEST_MODE_DOWNLOAD_LIMIT)
        } else {
            self.max_downloads
        }
    }

    /// How many presentations this run may look at. Only test mode sets one,
    /// so a run where every PDF fails still stops early.
    pub fn presentation_limit(&self) -> Option<usize> {
        self.test_mode.then_some(TEST_MODE_DOWNLOAD_LIMIT)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }

    pub fn login_settle_delay(&self) -> Duration {
        Duration::from_millis(self.login_settle_delay_ms)
    }
}

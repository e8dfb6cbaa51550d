pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod presentation;
pub mod session;

// Re-export important types for easier use in tests
pub use catalog::{Catalog, PresentationInfo};
pub use config::DownloaderConfig;
pub use error::DownloadError;
pub use pipeline::{PresentationDownloader, RunSummary};
pub use presentation::PresentationToDownload;
pub use session::Session;

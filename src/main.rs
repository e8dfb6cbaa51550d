use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use tctmd_downloader::config::TEST_MODE_DOWNLOAD_LIMIT;
use tctmd_downloader::logging::init_file_logger;
use tctmd_downloader::{DownloadError, DownloaderConfig, PresentationDownloader};

/// Download presentation slide PDFs from https://www.tctmd.com
#[derive(Debug, Parser)]
#[command(version, about, long_about = "Log in to https://www.tctmd.com and download the PDF slides of its presentations")]
pub struct Args {
    /// Account user name (usually an email address)
    #[arg(short, long, env = "TCTMD_USERNAME")]
    pub username: Option<String>,

    /// Account password
    #[arg(short, long, env = "TCTMD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// The output directory (default: downloads)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Only download a couple of PDFs to check that everything works
    #[arg(short, long)]
    pub test_mode: bool,

    /// Stop after this many PDFs
    #[arg(long)]
    pub max_downloads: Option<usize>,

    /// Last search results page to visit
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// JSON file with default settings; flags override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log file, appended to on every run
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Site root to talk to
    #[arg(long)]
    pub base_url: Option<String>,

    /// Log every request to the log file
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<DownloaderConfig, DownloadError> {
        let mut config = match &self.config {
            Some(path) => DownloaderConfig::load_from_file(path)?,
            None => DownloaderConfig::default(),
        };

        if let Some(username) = self.username {
            config.username = username;
        }
        if let Some(password) = self.password {
            config.password = password;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if self.test_mode {
            config.test_mode = true;
        }
        if self.max_downloads.is_some() {
            config.max_downloads = self.max_downloads;
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(log_file) = self.log_file {
            config.log_file = log_file;
        }
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose { LevelFilter::Trace } else { LevelFilter::Debug };

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_file_logger(&config.log_file, level) {
        eprintln!("✗ {} ({})", e, config.log_file.display());
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Run failed: {}", e);
            eprintln!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: DownloaderConfig) -> Result<(), DownloadError> {
    if config.test_mode {
        println!("Test mode: stopping after {} PDFs", TEST_MODE_DOWNLOAD_LIMIT);
    }
    println!("Saving PDFs to {}", config.output_dir.display());
    println!("Logging to {}", config.log_file.display());

    let downloader = PresentationDownloader::new(config)?;
    let summary = downloader.run().await?;

    println!(
        "Finished: {} downloaded, {} already present, {} without a PDF, {} failed",
        summary.downloaded, summary.already_present, summary.missing_pdf, summary.failed
    );

    Ok(())
}

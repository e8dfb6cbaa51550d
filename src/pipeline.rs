use std::collections::HashSet;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};

use crate::catalog::{Catalog, PresentationInfo};
use crate::config::DownloaderConfig;
use crate::downloader::{DownloadOutcome, download_pdf, ensure_dir_exists, file_progress_bar};
use crate::error::DownloadError;
use crate::presentation::PresentationToDownload;
use crate::session::Session;

/// Counts for one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub presentations_seen: usize,
    pub downloaded: usize,
    pub already_present: usize,
    /// Presentation pages without a PDF link
    pub missing_pdf: usize,
    pub failed: usize,
}

impl RunSummary {
    /// PDFs that count toward the download cap
    pub fn completed(&self) -> usize {
        self.downloaded + self.already_present
    }
}

/// Login → catalog → link extraction → download, one presentation at a time
pub struct PresentationDownloader {
    config: DownloaderConfig,
    session: Session,
}

impl PresentationDownloader {
    pub fn new(config: DownloaderConfig) -> Result<Self, DownloadError> {
        config.validate()?;
        ensure_dir_exists(&config.output_dir)?;
        let session = Session::new(&config)?;
        Ok(Self { config, session })
    }

    pub async fn run(&self) -> Result<RunSummary, DownloadError> {
        if let Err(e) = self.session.login(&self.config.username, &self.config.password).await {
            error!("Failed to login. Exiting. ({})", e);
            return Err(e);
        }
        info!("Successfully logged in, searching for presentations...");

        let limit = self.config.download_limit();
        if let Some(limit) = limit {
            info!("Download cap for this run: {}", limit);
        }
        if let Some(limit) = self.config.presentation_limit() {
            info!("Presentation cap for this run: {}", limit);
        }

        let catalog = Catalog::new(&self.session, self.config.search_url(), self.config.page_size);
        let multi_progress = MultiProgress::new();
        let main_pb = multi_progress.add(match limit {
            Some(limit) => ProgressBar::new(limit as u64),
            None => ProgressBar::no_length(),
        });
        main_pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} PDFs {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        );

        let mut summary = RunSummary::default();
        let mut seen: HashSet<String> = HashSet::new();

        'pages: for page in 1..=self.config.max_pages {
            let links = match catalog.fetch_page(page).await {
                Ok(links) => links,
                Err(e) if page == 1 => {
                    error!("No presentations found on first page: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Stopping at page {}: {}", page, e);
                    break;
                }
            };

            let new_links = links.into_iter()
                .filter(|url| seen.insert(url.clone()))
                .collect::<Vec<_>>();

            if new_links.is_empty() {
                if page == 1 {
                    error!("No presentations found on first page");
                    return Err(DownloadError::ElementNotFound(String::from("No presentations found on first page")));
                }
                info!("No new presentations on page {}, done paging", page);
                break;
            }
            info!("Found {} presentations on page {}", new_links.len(), page);

            for url in new_links {
                if self.cap_reached(&summary) {
                    break 'pages;
                }

                let presentation = PresentationInfo { index: summary.presentations_seen, url };
                summary.presentations_seen += 1;
                self.process(&presentation, &multi_progress, &mut summary).await;
                main_pb.set_position(summary.completed() as u64);
            }

            if self.cap_reached(&summary) {
                break;
            }
        }

        main_pb.finish_with_message(format!(
            "done: {} downloaded, {} already present, {} without PDF, {} failed",
            summary.downloaded, summary.already_present, summary.missing_pdf, summary.failed
        ));
        info!(
            "Finished: {} presentations seen, {} downloaded, {} already present, {} without PDF, {} failed",
            summary.presentations_seen, summary.downloaded, summary.already_present, summary.missing_pdf, summary.failed
        );

        Ok(summary)
    }

    /// Test mode also stops after a fixed number of presentations, whatever their outcome
    fn cap_reached(&self, summary: &RunSummary) -> bool {
        self.config.download_limit().is_some_and(|limit| summary.completed() >= limit)
            || self.config.presentation_limit().is_some_and(|limit| summary.presentations_seen >= limit)
    }

    /// Handle one presentation; errors are counted, never propagated
    async fn process(&self, presentation: &PresentationInfo, multi_progress: &MultiProgress, summary: &mut RunSummary) {
        info!("Processing presentation {}: {}", presentation.index + 1, presentation.url);

        let target = match PresentationToDownload::new(&self.session, presentation).await {
            Ok(target) => target,
            Err(DownloadError::ElementNotFound(_)) => {
                warn!("Could not get PDF URL from {}", presentation.url);
                summary.missing_pdf += 1;
                return;
            }
            Err(e) => {
                error!("Failed to load presentation {}: {}", presentation.url, e);
                let _ = multi_progress.println(format!("✗ Failed to load {}: {}", presentation.url, e));
                summary.failed += 1;
                return;
            }
        };

        let pb = multi_progress.add(file_progress_bar());
        let outcome = download_pdf(
            self.session.client(),
            &target.pdf_url,
            &self.config.output_dir,
            self.config.retry_count,
            self.config.retry_base_delay(),
            Some(&pb),
        ).await;

        match outcome {
            Ok(DownloadOutcome::Downloaded { path, .. }) => {
                summary.downloaded += 1;
                info!("Successfully downloaded PDF {} from {}", summary.completed(), target.link);
                pb.finish_and_clear();
                let _ = multi_progress.println(format!("✓ {}", path.display()));

                let delay = self.config.download_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Ok(DownloadOutcome::AlreadyPresent(path)) => {
                summary.already_present += 1;
                pb.finish_and_clear();
                let _ = multi_progress.println(format!("• {} (already present)", path.display()));
            }
            Err(e) => {
                summary.failed += 1;
                error!("Failed to download {}: {}", target.pdf_url, e);
                pb.finish_and_clear();
                let _ = multi_progress.println(format!("✗ {}: {}", target.pdf_url, e));
            }
        }
    }
}

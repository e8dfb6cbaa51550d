use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use reqwest::Url;

use crate::error::DownloadError;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq)]
pub struct PresentationInfo {
    pub index: usize,
    pub url: String,
}

/// Search-results listing of slide presentations
pub struct Catalog<'a> {
    session: &'a Session,
    search_url: String,
    page_size: usize,
}

impl<'a> Catalog<'a> {
    pub fn new(session: &'a Session, search_url: String, page_size: usize) -> Self {
        Self { session, search_url, page_size }
    }

    /// Fetch one page of slide results, newest first
    pub async fn fetch_page(&self, page: usize) -> Result<Vec<String>, DownloadError> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&[
                    "⠋ ", "⠙ ", "⠹ ", "⠸ ", "⠼ ", "⠴ ", "⠦ ", "⠧ ", "⠇ ", "⠏ "
                ])
        );
        spinner.set_message(format!("Fetching search results page {}...", page));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let query = search_query(page, self.page_size);
        let body = match self.session.get_text_with_query(&self.search_url, &query).await {
            Ok(body) => body,
            Err(e) => {
                spinner.finish_with_message(format!("✗ Failed to fetch page {}", page));
                error!("Failed to get search page {}: {}", page, e);
                return Err(e);
            }
        };

        let links = extract_presentation_links(&body, self.session.base_url());
        match &links {
            Ok(found) => spinner.finish_with_message(format!("✓ Page {}: {} presentations", page, found.len())),
            Err(_) => spinner.finish_with_message(format!("✗ Page {}: no results block", page)),
        }
        links
    }
}

fn search_query(page: usize, page_size: usize) -> Vec<(&'static str, String)> {
    vec![
        ("keyword", String::new()),
        ("type", String::from("slide")),
        ("desc", String::from("true")),
        ("page", page.to_string()),
        ("page_size", page_size.to_string()),
        ("sortmode", String::from("Date")),
        ("matching", String::from("AND")),
        ("searched", String::from("true")),
    ]
}

/// Pull the presentation detail links out of a search results page
pub fn extract_presentation_links(html: &str, base_url: &Url) -> Result<Vec<String>, DownloadError> {
    let document = scraper::Html::parse_document(html);

    let content_selector = scraper::Selector::parse("div#block-tctmd-content")
        .map_err(|_| DownloadError::SelectorError(String::from("Failed to parse div#block-tctmd-content selector")))?;
    let results_selector = scraper::Selector::parse("div.search-page__results")
        .map_err(|_| DownloadError::SelectorError(String::from("Failed to parse div.search-page__results selector")))?;
    let link_selector = scraper::Selector::parse("a[href]")
        .map_err(|_| DownloadError::SelectorError(String::from("Failed to parse a[href] selector")))?;

    let content = document.select(&content_selector).next()
        .ok_or_else(|| DownloadError::ElementNotFound(String::from("Could not find main content block")))?;

    let result_blocks = content.select(&results_selector).collect::<Vec<_>>();
    if result_blocks.is_empty() {
        debug!("No slide results in content block");
        return Ok(Vec::new());
    }

    let mut presentations: Vec<String> = Vec::new();
    for block in &result_blocks {
        let Some(href) = block.select(&link_selector).next().and_then(|a| a.attr("href")) else {
            continue;
        };
        if !href.contains("/slide/") {
            continue;
        }

        match base_url.join(href.trim()) {
            Ok(full_url) => {
                let full_url = full_url.to_string();
                if !presentations.contains(&full_url) {
                    info!("Found presentation: {}", full_url);
                    presentations.push(full_url);
                }
            }
            Err(e) => warn!("Skipping unparseable presentation link '{}': {}", href, e),
        }
    }

    if presentations.is_empty() {
        warn!("Found {} slide blocks but no valid presentation links", result_blocks.len());
        debug!("First slide block: {}", result_blocks[0].html());
    }

    Ok(presentations)
}

use log::{debug, info, warn};
use reqwest::Url;

use crate::catalog::PresentationInfo;
use crate::error::DownloadError;
use crate::session::{Session, preview};

pub struct PresentationToDownload {
    pub link: String,
    pub pdf_url: String,
}

impl PresentationToDownload {
    pub async fn new(session: &Session, info: &PresentationInfo) -> Result<Self, DownloadError> {
        let body = session.get_text(&info.url).await?;
        debug!("Presentation page HTML: {}", preview(&body, 2000));

        let page_url = Url::parse(&info.url)
            .map_err(|e| DownloadError::ParsingError(format!("Bad presentation URL '{}': {}", info.url, e)))?;

        match extract_pdf_link(&body, &page_url) {
            Some(pdf_url) => {
                info!("Found PDF link: {}", pdf_url);
                Ok(Self { link: info.url.clone(), pdf_url })
            }
            None => {
                warn!("No PDF link found in presentation: {}", info.url);
                Err(DownloadError::ElementNotFound(format!("No PDF link in {}", info.url)))
            }
        }
    }
}

/// Find the tracked download anchor that points at a PDF
pub fn extract_pdf_link(html: &str, page_url: &Url) -> Option<String> {
    let document = scraper::Html::parse_document(html);
    let selector = scraper::Selector::parse(r#"a[data-feathr-click-track="true"][href]"#).ok()?;

    document
        .select(&selector)
        .filter_map(|a| a.attr("href"))
        .map(str::trim)
        .find(|href| href.ends_with(".pdf"))
        .and_then(|href| page_url.join(href).ok())
        .map(|url| url.to_string())
}

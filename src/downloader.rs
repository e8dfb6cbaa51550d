use std::{env, path::{Path, PathBuf}, time::Duration};
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use log::{error, info, warn};
use reqwest::{StatusCode, Url};
use std::fmt::Write;
use tokio::io::AsyncWriteExt;

use crate::error::DownloadError;

/// What happened to a single PDF
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    /// A file with the target name was already in the output directory
    AlreadyPresent(PathBuf),
}

/// Byte-level progress bar for one file, in the same style as the rest of the CLI
pub fn file_progress_bar() -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec} ({eta}) {msg}"
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
        let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
    })
    .progress_chars("#>-");

    let pb = ProgressBar::new(0);
    pb.set_style(style);
    pb
}

/// Downloads one PDF into `output_dir`, retrying failed attempts
///
/// A 403 is final. Other bad statuses retry straight away; transport and
/// disk errors back off exponentially from `base_delay`.
pub async fn download_pdf(
    client: &reqwest::Client,
    url: &str,
    output_dir: &Path,
    retry_count: u32,
    base_delay: Duration,
    progress_bar: Option<&ProgressBar>,
) -> Result<DownloadOutcome, DownloadError> {
    let path = output_dir.join(pdf_filename(url)?);

    if path.exists() {
        info!("PDF already exists: {}", path.display());
        return Ok(DownloadOutcome::AlreadyPresent(path));
    }

    let mut last_error = String::from("no attempts made");

    for attempt in 0..retry_count {
        if let Some(pb) = progress_bar {
            pb.set_message(format!("attempt {}/{}", attempt + 1, retry_count));
        }

        match fetch_to_file(client, url, &path, progress_bar).await {
            Ok(bytes) => {
                info!("Successfully downloaded: {} ({} bytes)", path.display(), bytes);
                if let Some(pb) = progress_bar {
                    pb.finish_with_message("✓ Complete");
                }
                return Ok(DownloadOutcome::Downloaded { path, bytes });
            }
            Err(DownloadError::AccessDenied(denied)) => {
                error!("Access denied for {}", denied);
                if let Some(pb) = progress_bar {
                    pb.abandon_with_message("✗ Access denied");
                }
                return Err(DownloadError::AccessDenied(denied));
            }
            Err(e @ DownloadError::HttpStatus { .. }) => {
                error!("Failed to download {}: {}", url, e);
                last_error = e.to_string();
            }
            Err(e) => {
                error!("Error downloading {}: {}", url, e);
                last_error = e.to_string();
                if attempt + 1 < retry_count {
                    let delay = backoff_delay(base_delay, attempt);
                    warn!("Retrying {} in {:.1}s", url, delay.as_secs_f64());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    if let Some(pb) = progress_bar {
        pb.abandon_with_message(format!("✗ Failed: {}", last_error));
    }

    Err(DownloadError::RetriesExhausted {
        url: url.to_string(),
        attempts: retry_count,
        last_error,
    })
}

/// `base * 2^attempt`, saturating instead of overflowing
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(2u32.saturating_pow(attempt))
        .unwrap_or(Duration::MAX)
}

/// One attempt: GET the URL and stream it to `<path>.part`, then move it into place
async fn fetch_to_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    progress_bar: Option<&ProgressBar>,
) -> Result<u64, DownloadError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if status == StatusCode::FORBIDDEN {
        return Err(DownloadError::AccessDenied(url.to_string()));
    }
    if !status.is_success() {
        return Err(DownloadError::HttpStatus { status: status.as_u16(), url: url.to_string() });
    }

    if let Some(pb) = progress_bar {
        pb.set_length(response.content_length().unwrap_or(0));
        pb.set_position(0);
    }

    let part_path = partial_path(path);
    match stream_to_file(response, &part_path, progress_bar).await {
        Ok(bytes) => {
            tokio::fs::rename(&part_path, path).await?;
            Ok(bytes)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&part_path).await;
            Err(e)
        }
    }
}

async fn stream_to_file(
    mut response: reqwest::Response,
    path: &Path,
    progress_bar: Option<&ProgressBar>,
) -> Result<u64, DownloadError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        if let Some(pb) = progress_bar {
            pb.set_position(written);
        }
    }

    file.flush().await?;
    Ok(written)
}

fn partial_path(path: &Path) -> PathBuf {
    let name = path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.part", name))
}

/// Local file name for a PDF URL: its last path segment, made filesystem-safe
pub fn pdf_filename(url: &str) -> Result<String, DownloadError> {
    let parsed = Url::parse(url)
        .map_err(|e| DownloadError::ParsingError(format!("Invalid PDF URL '{}': {}", url, e)))?;

    let segment = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .ok_or_else(|| DownloadError::ParsingError(format!("No file name in URL {}", url)))?;

    let name = sanitize_filename(segment);
    if name.is_empty() {
        return Err(DownloadError::ParsingError(format!("No file name in URL {}", url)));
    }
    Ok(name)
}

/// Ensures a directory exists, creating it if necessary
pub fn ensure_dir_exists(path: &Path) -> Result<(), DownloadError> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .map_err(DownloadError::IoError)?;
    }
    Ok(())
}

/// Sanitizes a string to be safe as a filename across different operating systems
pub fn sanitize_filename(input: &str) -> String {
    let invalid_chars = match env::consts::OS {
        "windows" => r#"\/:*?"<>|"#,
        _ => "/",  // Unix-like systems mainly forbid slashes
    };

    let mut result: String = input
        .trim()
        .chars()
        .map(|c| if invalid_chars.contains(c) || c.is_control() { '_' } else { c })
        .collect();

    if env::consts::OS == "windows" {
        let reserved_names = [
            "CON", "PRN", "AUX", "NUL",
            "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
            "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9"
        ];

        let stem = result.split('.').next().unwrap_or_default();
        if reserved_names.iter().any(|&name| stem.eq_ignore_ascii_case(name)) {
            result = format!("_{}", result);
        }
    }

    // No hidden files
    if result.starts_with('.') {
        result = format!("_{}", result);
    }

    if result.len() > 255 {
        let mut cut = 255;
        while !result.is_char_boundary(cut) {
            cut -= 1;
        }
        result.truncate(cut);
    }

    result
}

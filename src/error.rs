use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum DownloadError {
    RequestFailed(reqwest::Error),
    IoError(std::io::Error),
    ParsingError(String),
    SelectorError(String),
    ElementNotFound(String),
    AttributeNotFound(String),
    LoginFailed(String),
    HttpStatus { status: u16, url: String },
    AccessDenied(String),
    TooManyRedirects(usize),
    RetriesExhausted { url: String, attempts: u32, last_error: String },
    ConfigError(String),
    LoggerError(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::RequestFailed(e) => write!(f, "Failed to make HTTP request: {}", e),
            DownloadError::IoError(e) => write!(f, "IO operation failed: {}", e),
            DownloadError::ParsingError(msg) => write!(f, "Failed to parse response: {}", msg),
            DownloadError::SelectorError(msg) => write!(f, "Invalid CSS selector: {}", msg),
            DownloadError::ElementNotFound(msg) => write!(f, "Element not found: {}", msg),
            DownloadError::AttributeNotFound(msg) => write!(f, "Attribute not found: {}", msg),
            DownloadError::LoginFailed(msg) => write!(f, "Login failed: {}", msg),
            DownloadError::HttpStatus { status, url } => write!(f, "HTTP error {} for URL {}", status, url),
            DownloadError::AccessDenied(url) => write!(f, "Access denied for {}", url),
            DownloadError::TooManyRedirects(max) => write!(f, "Too many redirects (limit {})", max),
            DownloadError::RetriesExhausted { url, attempts, last_error } => write!(
                f,
                "Giving up on {} after {} attempts: {}",
                url, attempts, last_error
            ),
            DownloadError::ConfigError(msg) => write!(f, "Invalid configuration: {}", msg),
            DownloadError::LoggerError(msg) => write!(f, "Failed to set up logging: {}", msg),
        }
    }
}

impl Error for DownloadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DownloadError::RequestFailed(e) => Some(e),
            DownloadError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        DownloadError::RequestFailed(err)
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        DownloadError::IoError(err)
    }
}

impl From<serde_json::Error> for DownloadError {
    fn from(err: serde_json::Error) -> Self {
        DownloadError::ParsingError(err.to_string())
    }
}

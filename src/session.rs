//! Authenticated HTTP session for the site.
//!
//! Login is a two-step dance: a form POST to the site's JSON login endpoint,
//! which answers with a single sign-on URL, then a hand-walked redirect chain
//! through the identity provider that plants the session cookies. Both clients
//! share one cookie jar so whatever the chain sets is sent on later requests.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use reqwest::cookie::Jar;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderValue, LOCATION, ORIGIN,
    PRAGMA, REFERER, SET_COOKIE,
};
use reqwest::{StatusCode, Url, redirect};
use serde_json::Value;

use crate::config::DownloaderConfig;
use crate::error::DownloadError;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0";

/// Marker the site puts on `<body>` once a user is signed in
const LOGGED_IN_CLASS: &str = "user-logged-in";

pub struct Session {
    client: reqwest::Client,
    /// Same cookie jar, but never follows redirects on its own
    redirect_client: reqwest::Client,
    base_url: Url,
    login_url: String,
    settle_delay: Duration,
    max_redirects: usize,
}

impl Session {
    pub fn new(config: &DownloaderConfig) -> Result<Self, DownloadError> {
        let jar = Arc::new(Jar::default());

        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .redirect(redirect::Policy::limited(10))
            .build()?;

        let redirect_client = reqwest::Client::builder()
            .cookie_provider(jar)
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            redirect_client,
            base_url: config.base_url()?,
            login_url: config.login_url(),
            settle_delay: config.login_settle_delay(),
            max_redirects: config.max_redirects,
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Log in and make sure the session ends up authenticated
    pub async fn login(&self, username: &str, password: &str) -> Result<(), DownloadError> {
        // Landing page first, for the site's initial cookies
        let initial = self.client.get(self.base_url.clone()).send().await?;
        debug!("Initial page status: {}", initial.status());

        let redirect_to = self.base_url.join("/").map_err(|e| DownloadError::ParsingError(e.to_string()))?;
        let form = [
            ("username", username),
            ("password", password),
            ("redirect_to", redirect_to.as_str()),
        ];

        let response = self.client
            .post(&self.login_url)
            .headers(self.login_headers()?)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        info!("Initial login response status: {}", status);
        let body = response.text().await?;

        if status != StatusCode::OK {
            error!("Login failed - unexpected response: {}", preview(&body, 500));
            return Err(DownloadError::LoginFailed(format!("login endpoint returned {}", status)));
        }

        let payload: Value = serde_json::from_str(&body).map_err(|e| {
            error!("Response content: {}", preview(&body, 500));
            DownloadError::LoginFailed(format!("login response is not JSON: {}", e))
        })?;

        if !payload.get("success").and_then(Value::as_bool).unwrap_or(false) {
            error!("Login rejected: {}", preview(&body, 500));
            return Err(DownloadError::LoginFailed(String::from("credentials were rejected")));
        }

        let cookie_redirect = payload
            .get("data")
            .and_then(|data| data.get("cookie_redirect"))
            .and_then(Value::as_str);

        if let Some(redirect_url) = cookie_redirect {
            self.follow_sso_redirects(redirect_url).await?;
        } else {
            debug!("Login succeeded without a cookie redirect");
        }

        if self.verify_login().await? {
            info!("Logged in as {}", username);
            Ok(())
        } else {
            Err(DownloadError::LoginFailed(String::from("session is not authenticated after login")))
        }
    }

    /// Walk the single sign-on redirect chain one hop at a time
    async fn follow_sso_redirects(&self, redirect_url: &str) -> Result<(), DownloadError> {
        debug!("Following sign-on redirect: {}", redirect_url);

        let mut current = self.base_url
            .join(redirect_url)
            .map_err(|e| DownloadError::ParsingError(format!("Bad redirect URL '{}': {}", redirect_url, e)))?;
        let mut headers = navigation_headers();
        headers.insert(REFERER, header_value(&format!("{}/", self.base_url.origin().ascii_serialization()))?);

        for hop in 0..self.max_redirects {
            debug!("Request {}: {}", hop + 1, current);

            let response = self.redirect_client
                .get(current.clone())
                .headers(headers.clone())
                .send()
                .await?;

            let status = response.status();
            debug!("Status: {}", status);
            for cookie in response.headers().get_all(SET_COOKIE) {
                debug!("Cookie: {}", cookie.to_str().unwrap_or("<binary>"));
            }

            match status {
                StatusCode::MOVED_PERMANENTLY
                | StatusCode::FOUND
                | StatusCode::SEE_OTHER
                | StatusCode::TEMPORARY_REDIRECT
                | StatusCode::PERMANENT_REDIRECT => {
                    let location = response.headers()
                        .get(LOCATION)
                        .and_then(|v| v.to_str().ok())
                        .ok_or_else(|| {
                            error!("Redirect with no Location header");
                            DownloadError::AttributeNotFound(format!("Location header missing on {} from {}", status, current))
                        })?;

                    let next = current
                        .join(location)
                        .map_err(|e| DownloadError::ParsingError(format!("Bad Location '{}': {}", location, e)))?;

                    // Any hop onto the site itself carries the site as Origin
                    if next.origin() == self.base_url.origin() {
                        debug!("Switching to {}", self.base_url);
                        headers.insert(ORIGIN, header_value(&self.base_url.origin().ascii_serialization())?);
                        headers.insert(REFERER, header_value(&format!("{}/", current.origin().ascii_serialization()))?);
                    }

                    debug!("Following redirect to: {}", next);
                    current = next;
                }
                StatusCode::OK => return Ok(()),
                other => {
                    error!("Unexpected status code during sign-on: {}", other);
                    return Err(DownloadError::LoginFailed(format!("sign-on redirect returned {}", other)));
                }
            }
        }

        error!("Too many redirects");
        Err(DownloadError::TooManyRedirects(self.max_redirects))
    }

    /// Check the landing page for the signed-in marker
    pub async fn verify_login(&self) -> Result<bool, DownloadError> {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let response = self.client.get(self.base_url.clone()).send().await?;
        if response.status() != StatusCode::OK {
            error!("Failed to get page for verification, status code: {}", response.status());
            return Err(DownloadError::HttpStatus {
                status: response.status().as_u16(),
                url: self.base_url.to_string(),
            });
        }

        let body = response.text().await?;
        let logged_in = is_logged_in_page(&body);
        if logged_in {
            info!("Login verified");
        } else {
            debug!("Could not find {} marker on the landing page", LOGGED_IN_CLASS);
        }
        Ok(logged_in)
    }

    pub async fn get_text(&self, url: &str) -> Result<String, DownloadError> {
        self.get_text_with_query(url, &[]).await
    }

    /// GET with the session cookies; anything but 2xx is an error
    pub async fn get_text_with_query(&self, url: &str, query: &[(&str, String)]) -> Result<String, DownloadError> {
        let response = self.client.get(url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(DownloadError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }

    fn login_headers(&self) -> Result<HeaderMap, DownloadError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"));
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(ORIGIN, header_value(&self.base_url.origin().ascii_serialization())?);
        headers.insert(REFERER, header_value(&format!("{}/", self.base_url.origin().ascii_serialization()))?);
        Ok(headers)
    }
}

/// Headers a browser sends on a top-level navigation
fn navigation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));
    headers
}

fn header_value(value: &str) -> Result<HeaderValue, DownloadError> {
    HeaderValue::from_str(value)
        .map_err(|e| DownloadError::ParsingError(format!("Invalid header value '{}': {}", value, e)))
}

/// True when the page was rendered for a signed-in user
pub fn is_logged_in_page(html: &str) -> bool {
    let document = scraper::Html::parse_document(html);

    if let Ok(body_selector) = scraper::Selector::parse("body") {
        if let Some(body) = document.select(&body_selector).next() {
            if body.value().classes().any(|class| class == LOGGED_IN_CLASS) {
                return true;
            }
            debug!("Body classes found: {:?}", body.value().classes().collect::<Vec<_>>());
        }
    }

    // Some themes put the marker on a wrapper instead of <body>
    html.contains(LOGGED_IN_CLASS)
}

/// First `max_chars` characters of a response body, for log lines
pub(crate) fn preview(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

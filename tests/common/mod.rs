#![allow(dead_code)]

use tctmd_downloader::DownloaderConfig;

pub const USERNAME: &str = "user@example.com";
pub const PASSWORD: &str = "secret";

pub const LOGGED_IN_PAGE: &str =
    r#"<html><body class="path-frontpage user-logged-in"><h1>Welcome</h1></body></html>"#;
pub const ANONYMOUS_PAGE: &str =
    r#"<html><body class="path-frontpage"><a href="/login">Log in</a></body></html>"#;

/// Config pointed at a mock server, with every sleep turned off
pub fn test_config(base_url: String) -> DownloaderConfig {
    DownloaderConfig {
        base_url,
        username: USERNAME.to_string(),
        password: PASSWORD.to_string(),
        retry_base_delay_ms: 0,
        download_delay_ms: 0,
        login_settle_delay_ms: 0,
        timeout_secs: 5,
        ..DownloaderConfig::default()
    }
}

/// A search results page linking to `/slide/<slug>` for each slug
pub fn search_page(slugs: &[&str]) -> String {
    let results = slugs
        .iter()
        .map(|slug| {
            format!(
                r#"<div class="search-page__results"><div class="card"><a href="/slide/{slug}">Talk {slug}</a><a href="/author/x">Author</a></div></div>"#
            )
        })
        .collect::<String>();
    format!(r#"<html><body><div id="block-tctmd-content"><h2>Results</h2>{results}</div></body></html>"#)
}

/// A presentation page whose tracked download link points at `<base>/files/<slug>.pdf`
pub fn presentation_page(base: &str, slug: &str) -> String {
    format!(
        r#"<html><body><h1>Talk {slug}</h1><a data-feathr-click-track="true" href="{base}/files/{slug}.pdf">Download slides</a></body></html>"#
    )
}

mod common;

use mockito::{Matcher, Server};
use reqwest::Url;
use tctmd_downloader::catalog::extract_presentation_links;
use tctmd_downloader::{Catalog, DownloadError, Session};

use common::{search_page, test_config};

fn base() -> Url {
    Url::parse("https://www.tctmd.com").unwrap()
}

#[test]
fn test_extract_presentation_links() {
    let links = extract_presentation_links(&search_page(&["first-talk", "second-talk"]), &base()).unwrap();

    assert_eq!(links, vec![
        "https://www.tctmd.com/slide/first-talk".to_string(),
        "https://www.tctmd.com/slide/second-talk".to_string(),
    ]);
}

#[test]
fn test_extract_skips_duplicates_and_non_slides() {
    let html = r#"
        <div id="block-tctmd-content">
            <div class="search-page__results"><a href="/slide/talk">Talk</a></div>
            <div class="search-page__results"><a href="/news/article">News</a></div>
            <div class="search-page__results"><a href="https://www.tctmd.com/slide/talk">Talk again</a></div>
            <div class="search-page__results"><span>No link</span></div>
        </div>
    "#;

    let links = extract_presentation_links(html, &base()).unwrap();
    assert_eq!(links, vec!["https://www.tctmd.com/slide/talk".to_string()]);
}

#[test]
fn test_extract_only_looks_inside_content_block() {
    let html = r#"
        <div class="search-page__results"><a href="/slide/sidebar">Sidebar</a></div>
        <div id="block-tctmd-content">
            <div class="search-page__results"><a href="/slide/main">Main</a></div>
        </div>
    "#;

    let links = extract_presentation_links(html, &base()).unwrap();
    assert_eq!(links, vec!["https://www.tctmd.com/slide/main".to_string()]);
}

#[test]
fn test_extract_empty_results() {
    let links = extract_presentation_links(&search_page(&[]), &base()).unwrap();
    assert!(links.is_empty());
}

#[test]
fn test_extract_missing_content_block() {
    let result = extract_presentation_links("<html><body><p>Oops</p></body></html>", &base());
    assert!(matches!(result, Err(DownloadError::ElementNotFound(_))));
}

#[tokio::test]
async fn test_fetch_page_sends_search_params() {
    let mut server = Server::new_async().await;
    let mock = server.mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("keyword".into(), "".into()),
            Matcher::UrlEncoded("type".into(), "slide".into()),
            Matcher::UrlEncoded("desc".into(), "true".into()),
            Matcher::UrlEncoded("page".into(), "2".into()),
            Matcher::UrlEncoded("page_size".into(), "12".into()),
            Matcher::UrlEncoded("sortmode".into(), "Date".into()),
            Matcher::UrlEncoded("matching".into(), "AND".into()),
            Matcher::UrlEncoded("searched".into(), "true".into()),
        ]))
        .with_status(200)
        .with_body(search_page(&["talk-a"]))
        .create_async()
        .await;

    let config = test_config(server.url());
    let session = Session::new(&config).unwrap();
    let catalog = Catalog::new(&session, config.search_url(), config.page_size);

    let links = catalog.fetch_page(2).await.unwrap();
    assert_eq!(links, vec![format!("{}/slide/talk-a", server.url())]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_page_error_status() {
    let mut server = Server::new_async().await;
    let _mock = server.mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let config = test_config(server.url());
    let session = Session::new(&config).unwrap();
    let catalog = Catalog::new(&session, config.search_url(), config.page_size);

    assert!(matches!(
        catalog.fetch_page(1).await,
        Err(DownloadError::HttpStatus { status: 503, .. })
    ));
}

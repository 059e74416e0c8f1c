//! Smoke tests against a real Chrome. Run with `cargo test -- --ignored`.

use std::time::Duration;

use listing_relay::{Locator, Poller, RelayBrowser, Session};
use tokio_util::sync::CancellationToken;

const FORM: &str = "data:text/html,<html><body>\
    <h1 class='title'>Listing 42</h1>\
    <span class='marker'>ID - 42</span>\
    <ul><li class='tile'>House</li><li class='tile'>Flat</li></ul>\
    <input name='area' value='old'>\
    <input type='file' name='photos' multiple>\
    <a class='crumb' href='/a'>A</a><a class='crumb' href='/b'>B</a>\
    </body></html>";

async fn open_form() -> (RelayBrowser, listing_relay::Page) {
    let browser = RelayBrowser::builder()
        .headless(true)
        .build()
        .await
        .expect("Failed to launch browser");
    let page = browser.new_page().await.expect("Failed to open page");
    page.goto(FORM).await.expect("Failed to load form");
    (browser, page)
}

#[tokio::test]
#[ignore = "needs a local Chrome"]
async fn test_locators_resolve() {
    let (browser, page) = open_form().await;

    assert_eq!(page.text(&Locator::css("h1.title")).await.unwrap(), "Listing 42");
    assert_eq!(
        page.text(&Locator::xpath("//span[contains(text(), 'ID -')]")).await.unwrap(),
        "ID - 42"
    );
    assert_eq!(page.count(&Locator::text("li", "Flat")).await.unwrap(), 1);
    assert_eq!(page.text(&Locator::css("li.tile").nth(1)).await.unwrap(), "Flat");
    assert_eq!(page.count(&Locator::text("li", "Commercial")).await.unwrap(), 0);

    browser.close().await;
}

#[tokio::test]
#[ignore = "needs a local Chrome"]
async fn test_query_all_reads_attributes() {
    let (browser, page) = open_form().await;

    let crumbs = page
        .query_all(&Locator::css("a.crumb"), &["href"], &[])
        .await
        .unwrap();
    assert_eq!(crumbs.len(), 2);
    assert_eq!(crumbs[1].text, "B");
    assert!(crumbs[0].attribute("href").unwrap().ends_with("/a"));

    browser.close().await;
}

#[tokio::test]
#[ignore = "needs a local Chrome"]
async fn test_fill_replaces_value() {
    let (browser, page) = open_form().await;
    let poller = Poller::new(
        Duration::from_millis(100),
        Duration::from_secs(5),
        CancellationToken::new(),
    );
    let input = Locator::css("input[name='area']");

    assert!(poller.fill_when_ready(&page, &input, "60").await.unwrap());
    let value: String = page
        .inner()
        .evaluate("document.querySelector(\"input[name='area']\").value")
        .await
        .unwrap()
        .into_value()
        .unwrap();
    assert_eq!(value, "60");

    browser.close().await;
}

#[tokio::test]
#[ignore = "needs a local Chrome"]
async fn test_set_files_attaches_upload() {
    let (browser, page) = open_form().await;
    let tmp = tempfile::TempDir::new().unwrap();
    let photo = tmp.path().join("42_1.jpg");
    std::fs::write(&photo, b"jpg").unwrap();

    page.set_files(&Locator::css("input[type='file']"), &[photo])
        .await
        .unwrap();
    let count: u32 = page
        .inner()
        .evaluate("document.querySelector(\"input[type='file']\").files.length")
        .await
        .unwrap()
        .into_value()
        .unwrap();
    assert_eq!(count, 1);

    browser.close().await;
}

#[tokio::test]
#[ignore = "needs a local Chrome"]
async fn test_missing_element_times_out() {
    let (browser, page) = open_form().await;
    let poller = Poller::new(
        Duration::from_millis(100),
        Duration::from_millis(500),
        CancellationToken::new(),
    );

    let clicked = poller
        .click_when_ready(&page, &Locator::text("li", "Commercial"))
        .await
        .unwrap();
    assert!(!clicked);

    browser.close().await;
}

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{element, quick_timing, with_attribute, with_child, FakeFetcher, FakeSession};
use listing_relay::error::Error;
use listing_relay::record::{detail, info, FEATURE_NO, FEATURE_YES, NOT_AVAILABLE};
use listing_relay::sites::source;
use listing_relay::{ExtractRequest, Extractor, Outcome, RecordStore, TimingConfig};
use tokio_util::sync::CancellationToken;

const URL: &str = "https://home.ss.ge/ka/udzravi-qoneba/12345";
const THUMB_1: &str = "https://img.example/p1_thumb.jpg";
const THUMB_2: &str = "https://img.example/p2_thumb.jpg";
const FULL_1: &str = "https://img.example/p1.jpg";
const FULL_2: &str = "https://img.example/p2.jpg";

fn request(comment: &str) -> ExtractRequest {
    ExtractRequest {
        url: URL.to_string(),
        agency_price: "99000".to_string(),
        comment: comment.to_string(),
    }
}

/// A listing page without a phone-reveal control.
fn listing_page() -> FakeSession {
    FakeSession::new()
        .text(source::id_marker(), "ID - 12345")
        .text(source::title(), "2-room flat")
        .text(source::address(), "Vake street 12")
        .text(source::price(), "95 000")
        .list(
            source::images(),
            vec![
                with_attribute(element(""), "src", THUMB_1),
                with_attribute(element(""), "src", THUMB_2),
            ],
        )
        .list(
            source::detail_rows(),
            vec![
                with_child(
                    with_child(element(""), source::DETAIL_TITLE, detail::ROOMS),
                    source::DETAIL_VALUE,
                    "2",
                ),
                with_child(
                    with_child(element(""), source::DETAIL_TITLE, detail::FLOOR),
                    source::DETAIL_VALUE,
                    "5 / 9",
                ),
            ],
        )
        .list(
            source::info_blocks(),
            vec![with_child(element(""), source::HEADING, "1")],
        )
        .list(
            source::feature_items(),
            vec![
                with_attribute(
                    with_child(element(""), source::HEADING, "აივანი"),
                    "class",
                    "item",
                ),
                with_attribute(
                    with_child(element(""), source::HEADING, "ლიფტი"),
                    "class",
                    &format!("item {}", source::FEATURE_ABSENT_CLASS),
                ),
            ],
        )
        .list(
            source::breadcrumb_links(),
            vec![element("უძრავი ქონება"), element("ბინა"), element("იყიდება")],
        )
}

fn extractor(root: &std::path::Path, fetcher: FakeFetcher) -> Extractor {
    Extractor::new(RecordStore::new(root), quick_timing(), Arc::new(fetcher))
}

#[tokio::test]
async fn page_without_phone_reveal_is_extracted_with_phone_missing() {
    let tmp = tempfile::TempDir::new().unwrap();
    let extractor = extractor(tmp.path(), FakeFetcher::serving(&[FULL_1, FULL_2]));
    let page = listing_page();

    let outcome = extractor
        .extract_with(&page, &request("call after 6pm"), CancellationToken::new())
        .await;

    assert_eq!(outcome.into_option().as_deref(), Some("12345"));
    assert_eq!(page.visits(), vec![URL.to_string()]);

    let record = extractor.store().load("12345").await.unwrap();
    assert_eq!(record.id, "12345");
    assert_eq!(record.title, "2-room flat");
    assert_eq!(record.phone, NOT_AVAILABLE);
    assert_eq!(record.name, NOT_AVAILABLE);
    assert_eq!((record.location.as_str(), record.number.as_str()), ("Vake street", "12"));
    assert_eq!(record.seller_price, "95 000");
    assert_eq!(record.agency_price, "99000");
    assert_eq!(record.comment, "call after 6pm");
    assert_eq!(record.images, vec![FULL_1.to_string(), FULL_2.to_string()]);
    assert_eq!(record.detail(detail::FLOOR_COUNT), Some("9"));
    assert_eq!(record.info(info::BATHROOMS), Some("1"));
    assert_eq!(record.features.get("აივანი").map(String::as_str), Some(FEATURE_YES));
    assert_eq!(record.features.get("ლიფტი").map(String::as_str), Some(FEATURE_NO));
    assert_eq!(record.breadcrumbs.transaction_type, "იყიდება");

    let images = extractor.store().image_files("12345").await.unwrap();
    assert_eq!(images.len(), 2);
    assert!(images[0].ends_with("images/12345_1.jpg"));
}

#[tokio::test]
async fn revealed_phone_is_read() {
    let tmp = tempfile::TempDir::new().unwrap();
    let extractor = extractor(tmp.path(), FakeFetcher::serving(&[FULL_1, FULL_2]));
    let page = listing_page()
        .clickable(source::phone_reveal())
        .text(source::phone(), "555 12 34 56");

    let outcome = extractor
        .extract_with(&page, &request(""), CancellationToken::new())
        .await;

    assert!(outcome.is_done());
    assert!(page.clicked(&source::phone_reveal()));
    let record = extractor.store().load("12345").await.unwrap();
    assert_eq!(record.phone, "555 12 34 56");
}

#[tokio::test]
async fn reextraction_overwrites_record_and_keeps_images() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = RecordStore::new(tmp.path());
    let images = store.prepare("12345").await.unwrap();
    std::fs::write(images.join("12345_1.jpg"), b"earlier").unwrap();
    std::fs::write(images.join("12345_7.jpg"), b"stale").unwrap();

    let fetcher = FakeFetcher::serving(&[FULL_1, FULL_2]);
    let extractor = extractor(tmp.path(), fetcher);

    for comment in ["first", "second"] {
        let outcome = extractor
            .extract_with(&listing_page(), &request(comment), CancellationToken::new())
            .await;
        assert!(outcome.is_done());
    }

    let record = extractor.store().load("12345").await.unwrap();
    assert_eq!(record.comment, "second");
    assert_eq!(std::fs::read(images.join("12345_1.jpg")).unwrap(), b"earlier");
    assert!(images.join("12345_7.jpg").exists());
    assert!(images.join("12345_2.jpg").exists());
}

#[tokio::test]
async fn failed_image_download_does_not_fail_extraction() {
    let tmp = tempfile::TempDir::new().unwrap();
    let extractor = extractor(tmp.path(), FakeFetcher::serving(&[FULL_2]));

    let outcome = extractor
        .extract_with(&listing_page(), &request(""), CancellationToken::new())
        .await;

    assert!(outcome.is_done());
    let files = extractor.store().image_files("12345").await.unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("images/12345_2.jpg"));
}

#[tokio::test]
async fn page_without_identifier_fails_and_stores_nothing() {
    let tmp = tempfile::TempDir::new().unwrap();
    let extractor = extractor(tmp.path(), FakeFetcher::default());
    let page = FakeSession::new().text(source::title(), "2-room flat");

    let outcome = extractor
        .extract_with(&page, &request(""), CancellationToken::new())
        .await;

    match outcome {
        Outcome::Failed(Error::MissingIdentifier(url)) => assert_eq!(url, URL),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(extractor.store().known_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_required_field_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let extractor = extractor(tmp.path(), FakeFetcher::default());
    let page = FakeSession::new()
        .text(source::id_marker(), "ID - 77")
        .text(source::address(), "Vake");

    let outcome = extractor
        .extract_with(&page, &request(""), CancellationToken::new())
        .await;

    assert!(matches!(outcome, Outcome::Failed(Error::ElementNotFound(_))));
    assert!(extractor.store().load("77").await.is_err());
}

#[tokio::test]
async fn cancelled_run_is_stopped_before_touching_the_page() {
    let tmp = tempfile::TempDir::new().unwrap();
    let extractor = extractor(tmp.path(), FakeFetcher::default());
    let page = listing_page();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = extractor.extract_with(&page, &request(""), cancel).await;

    assert!(outcome.is_stopped());
    assert!(page.visits().is_empty());
}

#[tokio::test]
async fn slow_gallery_is_awaited_for_the_element_timeout() {
    let tmp = tempfile::TempDir::new().unwrap();
    let timing = TimingConfig {
        poll_interval_ms: 20,
        element_timeout_ms: 2_000,
        ..quick_timing()
    };
    let fetcher = Arc::new(FakeFetcher::serving(&[FULL_1, FULL_2]));
    let extractor = Extractor::new(RecordStore::new(tmp.path()), timing, fetcher);
    let gallery = vec![
        with_attribute(element(""), "src", THUMB_1),
        with_attribute(element(""), "src", THUMB_2),
    ];
    let page = listing_page().list_after(source::images(), gallery, Duration::from_millis(300));

    let outcome = extractor
        .extract_with(&page, &request(""), CancellationToken::new())
        .await;

    assert_eq!(outcome.into_option().as_deref(), Some("12345"));
    let record = extractor.store().load("12345").await.unwrap();
    assert_eq!(record.images, vec![FULL_1.to_string(), FULL_2.to_string()]);
    assert_eq!(extractor.store().image_files("12345").await.unwrap().len(), 2);
}

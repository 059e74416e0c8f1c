use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::browser::RelayBrowser;
use crate::config::{BrowserConfig, TimingConfig};
use crate::error::{Error, Outcome, Result};
use crate::locator::Locator;
use crate::media::{self, MediaFetcher};
use crate::record::{
    detail, info, Breadcrumbs, ListingRecord, RecordStore, FEATURE_NO, FEATURE_YES, NOT_AVAILABLE,
};
use crate::session::{ElementData, Session};
use crate::sites::source;
use crate::wait::{Deadline, Poller};

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ID\s*-\s*([0-9A-Za-z]+)").expect("valid id pattern"));

static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)$").expect("valid number pattern"));

/// What to extract, plus the operator's own notes stored alongside.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub url: String,
    pub agency_price: String,
    pub comment: String,
}

/// Pulls one listing off the source site into a [`ListingRecord`] on disk.
pub struct Extractor {
    store: RecordStore,
    timing: TimingConfig,
    fetcher: Arc<dyn MediaFetcher>,
}

impl Extractor {
    pub fn new(store: RecordStore, timing: TimingConfig, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self {
            store,
            timing,
            fetcher,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Launch a browser, extract, and close the browser again whatever happened.
    pub async fn extract(
        &self,
        browser: &BrowserConfig,
        request: &ExtractRequest,
        cancel: CancellationToken,
    ) -> Outcome<String> {
        if cancel.is_cancelled() {
            return Outcome::Stopped;
        }
        let browser = match RelayBrowser::launch(browser).await {
            Ok(browser) => browser,
            Err(e) => {
                tracing::error!("extraction could not start: {e}");
                return Outcome::Failed(e);
            }
        };
        let outcome = match browser.new_page().await {
            Ok(page) => self.extract_with(&page, request, cancel).await,
            Err(e) => Outcome::Failed(e),
        };
        browser.close().await;
        outcome
    }

    /// Extract using an already open session. Returns the listing identifier.
    pub async fn extract_with<S>(
        &self,
        session: &S,
        request: &ExtractRequest,
        cancel: CancellationToken,
    ) -> Outcome<String>
    where
        S: Session + ?Sized,
    {
        let poller = self.timing.poller(cancel);
        let outcome = Outcome::from(self.run(session, request, &poller).await);
        match &outcome {
            Outcome::Done(id) => tracing::info!(%id, "extraction finished"),
            Outcome::Stopped => tracing::info!(url = %request.url, "extraction stopped"),
            Outcome::Failed(e) => tracing::error!(url = %request.url, "extraction failed: {e}"),
        }
        outcome
    }

    async fn run<S>(&self, session: &S, request: &ExtractRequest, poller: &Poller) -> Result<String>
    where
        S: Session + ?Sized,
    {
        tracing::info!(url = %request.url, "loading source page");
        poller.interruptible(session.goto(&request.url)).await?;

        let marker = poller
            .text_within(session, &source::id_marker(), poller.bounded())
            .await?
            .ok_or_else(|| Error::MissingIdentifier(request.url.clone()))?;
        let id = parse_identifier(&marker)
            .ok_or_else(|| Error::MissingIdentifier(request.url.clone()))?;
        poller.checkpoint()?;

        let images_dir = self.store.prepare(&id).await?;
        tracing::info!(%id, "record folder ready");

        let mut record = ListingRecord::new(id.clone());
        record.agency_price = request.agency_price.clone();
        record.comment = request.comment.clone();

        record.title = required_text(session, poller, &source::title(), "title").await?;
        let address = required_text(session, poller, &source::address(), "address").await?;
        (record.location, record.number) = split_address(&address);
        record.images = image_urls(session, poller).await?;
        record.seller_price = required_text(session, poller, &source::price(), "price").await?;
        record.name = optional_text(session, poller, &source::name()).await?;
        record.description = optional_text(session, poller, &source::description()).await?;

        record.phone = reveal_phone(session, poller).await?;

        let brief = poller.brief();
        record.property_details = best_effort("property details", async {
            let titles = [source::DETAIL_TITLE, source::DETAIL_VALUE];
            let rows = query_rows(session, poller, &source::detail_rows(), &[], &titles, brief)
                .await?;
            Ok(rows.map(|rows| parse_details(&rows)))
        })
        .await?;
        record.additional_info = best_effort("additional info", async {
            let headings = [source::HEADING];
            let blocks = query_rows(session, poller, &source::info_blocks(), &[], &headings, brief)
                .await?;
            Ok(blocks.map(|blocks| parse_info(&blocks)))
        })
        .await?;
        record.features = best_effort("features", async {
            let headings = [source::HEADING];
            let items =
                query_rows(session, poller, &source::feature_items(), &["class"], &headings, brief)
                    .await?;
            Ok(items.map(|items| parse_features(&items)))
        })
        .await?;
        record.breadcrumbs = best_effort("breadcrumbs", async {
            let links = query_rows(session, poller, &source::breadcrumb_links(), &[], &[], brief)
                .await?;
            Ok(links.map(|links| parse_breadcrumbs(&links)))
        })
        .await?;

        let fetcher = self.fetcher.as_ref();
        let saved =
            media::download_images(fetcher, poller, &record.images, &images_dir, &id).await?;
        tracing::info!(%id, saved = saved.len(), total = record.images.len(), "images stored");

        poller.checkpoint()?;
        let path = self.store.save(&record).await?;
        tracing::info!(%id, path = %path.display(), "record saved");
        Ok(id)
    }
}

/// Identifier out of the page's `ID - 12345` marker.
pub fn parse_identifier(marker: &str) -> Option<String> {
    ID_PATTERN
        .captures(marker)
        .map(|caps| caps[1].to_string())
        .filter(|id| !id.is_empty())
}

/// Split `"Some street 12"` into `("Some street", "12")`. Without a trailing
/// number the house number is empty.
pub fn split_address(address: &str) -> (String, String) {
    let address = address.trim();
    match TRAILING_NUMBER.find(address) {
        Some(m) => (address[..m.start()].trim().to_string(), m.as_str().to_string()),
        None => (address.to_string(), String::new()),
    }
}

pub fn parse_details(rows: &[ElementData]) -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();
    for row in rows {
        let title = row.child(source::DETAIL_TITLE).unwrap_or(NOT_AVAILABLE);
        let value = row.child(source::DETAIL_VALUE).unwrap_or(NOT_AVAILABLE).to_string();
        match title {
            detail::TOTAL_AREA | detail::ROOMS | detail::BEDROOMS => {
                details.insert(title.to_string(), value);
            }
            detail::FLOOR => {
                let (floor, count) = match value.split_once('/') {
                    Some((floor, count)) => (floor.trim().to_string(), count.trim().to_string()),
                    None => (value, NOT_AVAILABLE.to_string()),
                };
                details.insert(detail::FLOOR.to_string(), floor);
                details.insert(detail::FLOOR_COUNT.to_string(), count);
            }
            _ => {}
        }
    }
    details
}

pub fn parse_info(blocks: &[ElementData]) -> BTreeMap<String, String> {
    info::ORDER
        .iter()
        .zip(blocks)
        .map(|(key, block)| {
            let value = block.child(source::HEADING).unwrap_or(NOT_AVAILABLE);
            (key.to_string(), value.to_string())
        })
        .collect()
}

pub fn parse_features(items: &[ElementData]) -> BTreeMap<String, String> {
    items
        .iter()
        .map(|item| {
            let name = item.child(source::HEADING).unwrap_or(NOT_AVAILABLE);
            let marker = if item.has_class(source::FEATURE_ABSENT_CLASS) {
                FEATURE_NO
            } else {
                FEATURE_YES
            };
            (name.to_string(), marker.to_string())
        })
        .collect()
}

pub fn parse_breadcrumbs(links: &[ElementData]) -> Breadcrumbs {
    match links {
        [category, property_type, transaction_type, ..] => Breadcrumbs {
            category: category.text.clone(),
            property_type: property_type.text.clone(),
            transaction_type: transaction_type.text.clone(),
        },
        _ => Breadcrumbs::default(),
    }
}

async fn required_text<S>(
    session: &S,
    poller: &Poller,
    locator: &Locator,
    what: &str,
) -> Result<String>
where
    S: Session + ?Sized,
{
    poller
        .text_within(session, locator, poller.bounded())
        .await?
        .ok_or_else(|| Error::ElementNotFound(what.to_string()))
}

async fn optional_text<S>(session: &S, poller: &Poller, locator: &Locator) -> Result<String>
where
    S: Session + ?Sized,
{
    Ok(poller
        .text_within(session, locator, poller.brief())
        .await?
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string()))
}

async fn image_urls<S>(session: &S, poller: &Poller) -> Result<Vec<String>>
where
    S: Session + ?Sized,
{
    let thumbs = query_rows(session, poller, &source::images(), &["src"], &[], poller.bounded())
        .await?
        .ok_or_else(|| Error::ElementNotFound("image gallery".into()))?;
    Ok(thumbs
        .iter()
        .filter_map(|thumb| thumb.attribute("src"))
        .map(media::full_size_url)
        .collect())
}

async fn reveal_phone<S>(session: &S, poller: &Poller) -> Result<String>
where
    S: Session + ?Sized,
{
    if !poller.click_when_ready(session, &source::phone_reveal()).await? {
        tracing::warn!("no phone reveal control");
    }
    optional_text(session, poller, &source::phone()).await
}

/// All matches of `locator` once at least one exists, `None` if none showed
/// up before `deadline`.
async fn query_rows<S>(
    session: &S,
    poller: &Poller,
    locator: &Locator,
    attributes: &[&str],
    children: &[&str],
    deadline: Deadline,
) -> Result<Option<Vec<ElementData>>>
where
    S: Session + ?Sized,
{
    poller
        .await_condition(deadline, move || async move {
            let found = session.query_all(locator, attributes, children).await?;
            if found.is_empty() {
                Err(Error::ElementNotFound(locator.to_string()))
            } else {
                Ok(found)
            }
        })
        .await
}

/// Run one grouped sub-query. Anything but cancellation is logged and
/// replaced by the default value.
async fn best_effort<T, F>(what: &str, query: F) -> Result<T>
where
    T: Default,
    F: std::future::Future<Output = Result<Option<T>>>,
{
    match query.await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => {
            tracing::warn!("{what} not found on page");
            Ok(T::default())
        }
        Err(Error::Cancelled) => Err(Error::Cancelled),
        Err(e) => {
            tracing::warn!("could not read {what}: {e}");
            Ok(T::default())
        }
    }
}

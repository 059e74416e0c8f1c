use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::browser::RelayBrowser;
use crate::config::{BrowserConfig, ResultStrategy, TimingConfig};
use crate::credentials::Credentials;
use crate::error::{Error, Outcome, Result};
use crate::locator::Locator;
use crate::record::{detail, info, is_present, ListingRecord, RecordStore};
use crate::session::Session;
use crate::sites::destination;
use crate::wait::{Deadline, Poller};

/// One listing to replay into the destination form.
#[derive(Debug, Clone)]
pub struct PopulateRequest {
    pub credentials: Credentials,
    /// Contact phone for the new listing. Empty means the record's own phone.
    pub phone: String,
    pub id: String,
    pub enter_description: bool,
}

/// Replays a stored [`ListingRecord`] into the destination site's create form.
pub struct Populator {
    store: RecordStore,
    timing: TimingConfig,
    destination_url: String,
    strategy: ResultStrategy,
}

impl Populator {
    pub fn new(store: RecordStore, timing: TimingConfig) -> Self {
        Self {
            store,
            timing,
            destination_url: destination::CREATE_URL.to_string(),
            strategy: ResultStrategy::default(),
        }
    }

    pub fn destination_url(mut self, url: impl Into<String>) -> Self {
        self.destination_url = url.into();
        self
    }

    pub fn result_strategy(mut self, strategy: ResultStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Load the record, launch a browser, fill the form and close the browser
    /// again whatever happened. Returns the address of the new listing.
    pub async fn populate(
        &self,
        browser: &BrowserConfig,
        request: &PopulateRequest,
        cancel: CancellationToken,
    ) -> Outcome<String> {
        if cancel.is_cancelled() {
            return Outcome::Stopped;
        }
        let (record, images) = match self.load(&request.id).await {
            Ok(loaded) => loaded,
            Err(e) => return self.report(request, Outcome::Failed(e)),
        };
        let browser = match RelayBrowser::launch(browser).await {
            Ok(browser) => browser,
            Err(e) => return self.report(request, Outcome::Failed(e)),
        };
        let outcome = match browser.new_page().await {
            Ok(page) => {
                let poller = self.timing.poller(cancel);
                Outcome::from(self.fill(&page, &record, &images, request, &poller).await)
            }
            Err(e) => Outcome::Failed(e),
        };
        browser.close().await;
        self.report(request, outcome)
    }

    /// Populate using an already open session.
    pub async fn populate_with<S>(
        &self,
        session: &S,
        request: &PopulateRequest,
        cancel: CancellationToken,
    ) -> Outcome<String>
    where
        S: Session + ?Sized,
    {
        let poller = self.timing.poller(cancel);
        let result = async {
            poller.checkpoint()?;
            let (record, images) = self.load(&request.id).await?;
            self.fill(session, &record, &images, request, &poller).await
        }
        .await;
        self.report(request, Outcome::from(result))
    }

    async fn load(&self, id: &str) -> Result<(ListingRecord, Vec<PathBuf>)> {
        let record = self.store.load(id).await?;
        let images = self.store.image_files(id).await?;
        tracing::info!(id, images = images.len(), "record loaded");
        Ok((record, images))
    }

    fn report(&self, request: &PopulateRequest, outcome: Outcome<String>) -> Outcome<String> {
        match &outcome {
            Outcome::Done(url) => tracing::info!(id = %request.id, %url, "listing submitted"),
            Outcome::Stopped => tracing::info!(id = %request.id, "population stopped"),
            Outcome::Failed(e) => tracing::error!(id = %request.id, "population failed: {e}"),
        }
        outcome
    }

    async fn fill<S>(
        &self,
        session: &S,
        record: &ListingRecord,
        images: &[PathBuf],
        request: &PopulateRequest,
        poller: &Poller,
    ) -> Result<String>
    where
        S: Session + ?Sized,
    {
        self.sign_in(session, poller, &request.credentials).await?;

        if poller
            .present(session, &destination::resume_draft(), poller.brief())
            .await?
        {
            tracing::info!("resuming unfinished submission");
            click(session, poller, &destination::resume_draft(), "resume button").await?;
        }

        poller.checkpoint()?;
        select_category(session, poller, &record.breadcrumbs.property_type).await?;
        select_category(session, poller, &record.breadcrumbs.transaction_type).await?;

        let uploaded = self.upload_images(session, poller, images).await?;
        tracing::info!(uploaded, total = images.len(), "images uploaded");

        self.enter_address(session, poller, record).await?;
        fill_details(session, poller, record).await?;

        poller.checkpoint()?;
        optional("features", toggle_features(session, poller, record)).await?;

        if request.enter_description && is_present(&record.description) {
            let description = destination::description();
            fill(session, poller, &description, &record.description, "description").await?;
        }

        if is_present(&record.agency_price) {
            if optional("price", enter_price(session, poller, &record.agency_price))
                .await?
                .is_none()
            {
                tracing::warn!("price left empty");
            }
        }

        let phone = if is_present(&request.phone) {
            request.phone.as_str()
        } else {
            record.phone.as_str()
        };
        if is_present(phone) {
            fill(session, poller, &destination::phone(), phone, "phone input").await?;
        }

        tracing::info!("waiting for the form to accept the details");
        poller
            .click_within(session, &destination::continue_button(), Deadline::Unbounded)
            .await?;
        tracing::info!("waiting for the finish control");
        poller
            .click_within(session, &destination::finish_button(), Deadline::Unbounded)
            .await?;

        match self.strategy {
            ResultStrategy::Address => self.published_address(session, poller).await,
            ResultStrategy::Clipboard => copied_link(session, poller).await,
        }
    }

    async fn sign_in<S>(
        &self,
        session: &S,
        poller: &Poller,
        credentials: &Credentials,
    ) -> Result<()>
    where
        S: Session + ?Sized,
    {
        tracing::info!(url = %self.destination_url, "loading destination form");
        poller.interruptible(session.goto(&self.destination_url)).await?;
        click(session, poller, &destination::login_open(), "login control").await?;
        fill(session, poller, &destination::email(), &credentials.username, "email input").await?;
        let password = destination::password();
        fill(session, poller, &password, &credentials.password, "password input").await?;
        click(session, poller, &destination::login_submit(), "login button").await?;
        tracing::info!(user = %credentials.username, "signed in");
        Ok(())
    }

    /// Attach each file in turn. A file the input refuses is skipped.
    async fn upload_images<S>(
        &self,
        session: &S,
        poller: &Poller,
        images: &[PathBuf],
    ) -> Result<usize>
    where
        S: Session + ?Sized,
    {
        let input = &destination::file_input();
        let mut uploaded = 0;
        for path in images {
            poller.checkpoint()?;
            let files = std::slice::from_ref(path);
            let attached = poller
                .await_condition(poller.bounded(), move || session.set_files(input, files))
                .await?;
            match attached {
                Some(()) => {
                    uploaded += 1;
                    tracing::debug!(path = %path.display(), "image attached");
                }
                None => tracing::warn!(path = %path.display(), "image upload failed, skipping"),
            }
            poller.pause(self.timing.upload_pause()).await?;
        }
        Ok(uploaded)
    }

    /// Type the street into the typeahead and commit its first suggestion.
    async fn enter_address<S>(
        &self,
        session: &S,
        poller: &Poller,
        record: &ListingRecord,
    ) -> Result<()>
    where
        S: Session + ?Sized,
    {
        if !is_present(&record.location) {
            tracing::warn!("record has no address");
            return Ok(());
        }
        let input = destination::address_input();
        fill(session, poller, &input, &record.location, "address input").await?;
        poller.pause(self.timing.suggestion_pause()).await?;
        for key in ["ArrowDown", "Enter"] {
            if !poller.press_when_ready(session, &input, key).await? {
                return Err(Error::ElementNotFound("address input".into()));
            }
        }

        if is_present(&record.number) {
            optional(
                "house number",
                poller.fill_when_ready(session, &destination::house_number(), &record.number),
            )
            .await?;
        }
        Ok(())
    }

    /// Address of the page the form lands on once finished. Falls back to
    /// whatever is loaded if the page never leaves the form.
    async fn published_address<S>(&self, session: &S, poller: &Poller) -> Result<String>
    where
        S: Session + ?Sized,
    {
        let form = self.destination_url.as_str();
        let moved = poller
            .await_condition(poller.bounded(), move || async move {
                let url = session.current_url().await?;
                if url.starts_with(form) {
                    Err(Error::NavigationError("still on the create form".into()))
                } else {
                    Ok(url)
                }
            })
            .await?;
        match moved {
            Some(url) => Ok(url),
            None => {
                tracing::warn!("page did not leave the form, using its current address");
                poller.interruptible(session.current_url()).await
            }
        }
    }
}

/// Click "copy link" and read the clipboard until it holds something.
async fn copied_link<S>(session: &S, poller: &Poller) -> Result<String>
where
    S: Session + ?Sized,
{
    click(session, poller, &destination::copy_link_button(), "copy link button").await?;
    let link = poller
        .await_condition(poller.bounded(), move || async move {
            let text = session.read_clipboard().await?;
            match text.trim() {
                "" => Err(Error::ElementNotFound("link in clipboard".into())),
                link => Ok(link.to_string()),
            }
        })
        .await?;
    link.ok_or_else(|| Error::Timeout("clipboard stayed empty".into()))
}

async fn select_category<S>(session: &S, poller: &Poller, label: &str) -> Result<()>
where
    S: Session + ?Sized,
{
    if !is_present(label) {
        tracing::warn!("category missing from record, leaving default");
        return Ok(());
    }
    if poller
        .click_when_ready(session, &destination::category_option(label))
        .await?
    {
        tracing::debug!(label, "category selected");
        Ok(())
    } else {
        Err(Error::NoMatchingOption(label.to_string()))
    }
}

async fn fill_details<S>(session: &S, poller: &Poller, record: &ListingRecord) -> Result<()>
where
    S: Session + ?Sized,
{
    poller.checkpoint()?;
    if let Some(rooms) = record.detail(detail::ROOMS) {
        click(session, poller, &destination::choice(rooms), "rooms option").await?;
    }
    if let Some(bedrooms) = record.detail(detail::BEDROOMS) {
        click(session, poller, &destination::bedroom_choice(bedrooms), "bedrooms option").await?;
    }
    let inputs = [
        (detail::TOTAL_AREA, destination::total_area(), "total area input"),
        (detail::FLOOR, destination::floor(), "floor input"),
        (detail::FLOOR_COUNT, destination::floor_count(), "floor count input"),
    ];
    for (key, locator, what) in &inputs {
        if let Some(value) = record.detail(key) {
            fill(session, poller, locator, value, what).await?;
        }
    }

    if let Some(bathrooms) = record.info(info::BATHROOMS) {
        optional(
            "bathrooms",
            poller.click_when_ready(session, &destination::bathroom_choice(bathrooms)),
        )
        .await?;
    }
    for (key, what) in [(info::STATUS, "status option"), (info::CONDITION, "condition option")] {
        if let Some(label) = record.info(key) {
            click(session, poller, &destination::choice(label), what).await?;
        }
    }
    Ok(())
}

/// Click the toggle of every feature the record marks present. Features the
/// form does not list are ignored.
async fn toggle_features<S>(session: &S, poller: &Poller, record: &ListingRecord) -> Result<bool>
where
    S: Session + ?Sized,
{
    let wanted: HashSet<&str> = record.present_features().collect();
    if wanted.is_empty() {
        return Ok(true);
    }
    let toggles = &destination::feature_toggles();
    let listed = poller
        .await_condition(poller.bounded(), move || async move {
            let found = session
                .query_all(toggles, &[], &[destination::FEATURE_LABEL])
                .await?;
            if found.is_empty() {
                Err(Error::ElementNotFound(toggles.to_string()))
            } else {
                Ok(found)
            }
        })
        .await?;
    let Some(listed) = listed else {
        return Ok(false);
    };

    for (index, item) in listed.iter().enumerate() {
        let Some(label) = item.child(destination::FEATURE_LABEL).map(str::trim) else {
            continue;
        };
        if !wanted.contains(label) {
            continue;
        }
        if !poller.click_when_ready(session, &toggles.clone().nth(index)).await? {
            tracing::warn!(feature = label, "feature toggle did not respond");
        }
    }
    Ok(true)
}

/// Pick the price mode that is not selected yet and type the price into it.
async fn enter_price<S>(session: &S, poller: &Poller, price: &str) -> Result<bool>
where
    S: Session + ?Sized,
{
    let modes = &destination::price_modes();
    let labels = poller
        .await_condition(poller.bounded(), move || async move {
            let found = session.query_all(modes, &["class"], &[]).await?;
            if found.is_empty() {
                Err(Error::ElementNotFound(modes.to_string()))
            } else {
                Ok(found)
            }
        })
        .await?;
    let Some(index) = labels
        .as_deref()
        .and_then(|labels| labels.iter().position(|l| !l.has_class(destination::ACTIVE_CLASS)))
    else {
        return Ok(false);
    };
    if !poller.click_when_ready(session, &modes.clone().nth(index)).await? {
        return Ok(false);
    }
    poller
        .fill_when_ready(session, &destination::price_input(index), price)
        .await
}

async fn click<S>(session: &S, poller: &Poller, locator: &Locator, what: &str) -> Result<()>
where
    S: Session + ?Sized,
{
    if poller.click_when_ready(session, locator).await? {
        Ok(())
    } else {
        Err(Error::ElementNotFound(what.to_string()))
    }
}

async fn fill<S>(
    session: &S,
    poller: &Poller,
    locator: &Locator,
    value: &str,
    what: &str,
) -> Result<()>
where
    S: Session + ?Sized,
{
    if poller.fill_when_ready(session, locator, value).await? {
        Ok(())
    } else {
        Err(Error::ElementNotFound(what.to_string()))
    }
}

/// Run a stage that may be skipped. `Ok(None)` when it did not take effect;
/// only cancellation is passed on.
async fn optional<F>(what: &str, stage: F) -> Result<Option<()>>
where
    F: Future<Output = Result<bool>>,
{
    match stage.await {
        Ok(true) => Ok(Some(())),
        Ok(false) => {
            tracing::warn!("{what} skipped: control not found");
            Ok(None)
        }
        Err(Error::Cancelled) => Err(Error::Cancelled),
        Err(e) => {
            tracing::warn!("{what} skipped: {e}");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn optional_stage_swallows_failures_but_not_cancellation() {
        assert_eq!(optional("x", async { Ok(true) }).await.unwrap(), Some(()));
        assert_eq!(optional("x", async { Ok(false) }).await.unwrap(), None);
        assert_eq!(
            optional("x", async { Err(Error::JsError("boom".into())) })
                .await
                .unwrap(),
            None
        );
        assert!(optional("x", async { Err(Error::Cancelled) })
            .await
            .unwrap_err()
            .is_cancelled());
    }
}

//! Runs extract and populate operations on worker tasks and keeps the
//! tracking sheet in step with their results.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::credentials::{CredentialSource, TomlCredentials};
use crate::error::{Outcome, Result};
use crate::extract::{ExtractRequest, Extractor};
use crate::media::{HttpFetcher, MediaFetcher};
use crate::populate::{PopulateRequest, Populator};
use crate::record::RecordStore;
use crate::sheet::{self, RecordSheet, XlsxSheet};

/// How to publish a record, minus the record itself.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Key into the credential source.
    pub account: String,
    pub phone: String,
    pub enter_description: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            account: "default".to_string(),
            phone: String::new(),
            enter_description: true,
        }
    }
}

pub struct Relay {
    config: AppConfig,
    extractor: Arc<Extractor>,
    populator: Arc<Populator>,
    credentials: Box<dyn CredentialSource>,
    sheet: Box<dyn RecordSheet>,
}

impl Relay {
    pub fn new(
        config: AppConfig,
        fetcher: Arc<dyn MediaFetcher>,
        credentials: Box<dyn CredentialSource>,
        sheet: Box<dyn RecordSheet>,
    ) -> Self {
        let store = RecordStore::new(&config.records_root);
        let extractor = Extractor::new(store.clone(), config.timing.clone(), fetcher);
        let populator = Populator::new(store, config.timing.clone())
            .destination_url(config.destination_url.clone())
            .result_strategy(config.result_strategy);
        Self {
            config,
            extractor: Arc::new(extractor),
            populator: Arc::new(populator),
            credentials,
            sheet,
        }
    }

    /// Wire up the HTTP fetcher, credentials file and sheet named by `config`.
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let credentials = TomlCredentials::load(&config.credentials_path)?;
        let sheet = XlsxSheet::open(&config.sheet_path).await?;
        Ok(Self::new(
            config,
            Arc::new(HttpFetcher::new()?),
            Box::new(credentials),
            Box::new(sheet),
        ))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &RecordStore {
        self.extractor.store()
    }

    pub fn sheet(&self) -> &dyn RecordSheet {
        self.sheet.as_ref()
    }

    /// Extract one listing and log it in the sheet as not yet published.
    pub async fn extract(
        &mut self,
        request: ExtractRequest,
        cancel: CancellationToken,
    ) -> Outcome<String> {
        let outcome = self.spawn_extract(request, cancel).await;
        if let Outcome::Done(id) = &outcome {
            self.log_extracted(id).await;
        }
        outcome
    }

    /// Publish a stored record and write the resulting link into its sheet row.
    pub async fn populate(
        &mut self,
        id: &str,
        options: &PublishOptions,
        cancel: CancellationToken,
    ) -> Outcome<String> {
        let outcome = self.spawn_populate(id, options, cancel).await;
        if let Outcome::Done(url) = &outcome {
            self.update_cell(id, sheet::LINK, url).await;
        }
        outcome
    }

    /// Extract, log, publish, then stamp the row with the time and link.
    pub async fn run(
        &mut self,
        request: ExtractRequest,
        options: &PublishOptions,
        cancel: CancellationToken,
    ) -> Outcome<String> {
        let id = match self.extract(request, cancel.clone()).await {
            Outcome::Done(id) => id,
            Outcome::Stopped => return Outcome::Stopped,
            Outcome::Failed(e) => return Outcome::Failed(e),
        };
        let outcome = self.spawn_populate(&id, options, cancel).await;
        if let Outcome::Done(url) = &outcome {
            self.update_cell(&id, sheet::TIMESTAMP, &now()).await;
            self.update_cell(&id, sheet::LINK, url).await;
        }
        outcome
    }

    pub async fn known_ids(&self) -> Result<Vec<String>> {
        self.store().known_ids().await
    }

    async fn spawn_extract(
        &self,
        request: ExtractRequest,
        cancel: CancellationToken,
    ) -> Outcome<String> {
        let extractor = Arc::clone(&self.extractor);
        let browser = self.config.browser.clone();
        on_worker(async move { extractor.extract(&browser, &request, cancel).await }).await
    }

    async fn spawn_populate(
        &self,
        id: &str,
        options: &PublishOptions,
        cancel: CancellationToken,
    ) -> Outcome<String> {
        let credentials = match self.credentials.credentials(&options.account) {
            Ok(credentials) => credentials,
            Err(e) => return Outcome::Failed(e),
        };
        let request = PopulateRequest {
            credentials,
            phone: options.phone.clone(),
            id: id.to_string(),
            enter_description: options.enter_description,
        };
        let populator = Arc::clone(&self.populator);
        let browser = self.config.populate_browser();
        on_worker(async move { populator.populate(&browser, &request, cancel).await }).await
    }

    async fn log_extracted(&mut self, id: &str) {
        let record = match self.store().load(id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(id, "could not reread record for the sheet: {e}");
                return;
            }
        };
        let cells = sheet::record_row(&record, sheet::SCRAPE_ONLY);
        if let Err(e) = self.sheet.append_row(id, &cells).await {
            tracing::warn!(id, "could not append sheet row: {e}");
        }
    }

    /// Sheet failures never undo a finished operation; they are only logged.
    async fn update_cell(&mut self, id: &str, header: &str, value: &str) {
        if let Err(e) = self.sheet.update_column(id, header, value).await {
            tracing::warn!(id, header, "could not update sheet: {e}");
        }
    }
}

/// Run an operation on its own task. A panic there is reported as a failure.
async fn on_worker<F>(operation: F) -> Outcome<String>
where
    F: Future<Output = Outcome<String>> + Send + 'static,
{
    match tokio::spawn(operation).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("worker task ended abnormally: {e}");
            Outcome::Failed(e.into())
        }
    }
}

fn now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn worker_panic_is_a_failure() {
        let outcome = on_worker(async {
            let missing: Option<String> = None;
            Outcome::Done(missing.expect("boom"))
        })
        .await;
        assert!(outcome.is_failed());
    }

    #[tokio::test]
    async fn worker_outcome_is_passed_through() {
        let outcome = on_worker(async { Outcome::Done("x".to_string()) }).await;
        assert_eq!(outcome.into_option().as_deref(), Some("x"));
    }

    async fn relay(tmp: &tempfile::TempDir) -> Relay {
        let config = AppConfig {
            records_root: tmp.path().join("data"),
            sheet_path: tmp.path().join("scraped_data.xlsx"),
            ..AppConfig::default()
        };
        let sheet = XlsxSheet::open(&config.sheet_path).await.unwrap();
        Relay::new(
            config,
            Arc::new(HttpFetcher::new().unwrap()),
            Box::new(TomlCredentials::default()),
            Box::new(sheet),
        )
    }

    #[tokio::test]
    async fn extracted_record_is_logged_and_later_linked() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut relay = relay(&tmp).await;
        let mut record = crate::record::ListingRecord::new("12345");
        record.phone = "555 00 00 00".into();
        relay.store().save(&record).await.unwrap();

        relay.log_extracted("12345").await;
        relay.update_cell("12345", sheet::LINK, "https://x/1").await;

        let reopened = XlsxSheet::open(tmp.path().join("scraped_data.xlsx")).await.unwrap();
        let cell = |header| reopened.value("12345", header);
        assert_eq!(cell(sheet::TIMESTAMP).as_deref(), Some(sheet::SCRAPE_ONLY));
        assert_eq!(cell(sheet::PHONE).as_deref(), Some("555 00 00 00"));
        assert_eq!(cell(sheet::LINK).as_deref(), Some("https://x/1"));
    }

    #[tokio::test]
    async fn sheet_failure_is_only_logged() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut relay = relay(&tmp).await;

        relay.update_cell("unknown", sheet::LINK, "https://x/1").await;

        assert_eq!(relay.sheet().value("unknown", sheet::LINK), None);
        assert!(!tmp.path().join("scraped_data.xlsx").exists());
    }

    #[test]
    fn timestamp_is_not_the_scrape_marker() {
        assert_ne!(now(), sheet::SCRAPE_ONLY);
        assert_eq!(now().len(), "2024-01-01 00:00:00".len());
    }
}

pub mod browser;
pub mod config;
pub mod credentials;
pub mod element;
pub mod error;
pub mod extract;
pub mod locator;
pub mod media;
pub mod page;
pub mod pipeline;
pub mod populate;
pub mod record;
pub mod session;
pub mod sheet;
pub mod sites;
pub mod wait;

pub use browser::RelayBrowser;
pub use config::{AppConfig, BrowserConfig, ResultStrategy, TimingConfig};
pub use credentials::{CredentialSource, Credentials, TomlCredentials};
pub use error::{Error, Outcome, Result};
pub use extract::{ExtractRequest, Extractor};
pub use locator::Locator;
pub use media::{HttpFetcher, MediaFetcher};
pub use page::Page;
pub use pipeline::{PublishOptions, Relay};
pub use populate::{PopulateRequest, Populator};
pub use record::{ListingRecord, RecordStore};
pub use session::{ElementData, Session};
pub use sheet::{RecordSheet, XlsxSheet};
pub use wait::{Deadline, Poller};

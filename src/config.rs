use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::browser::RelayBrowser;
use crate::error::{Error, Result};
use crate::wait::Poller;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub chrome_path: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            chrome_path: None,
        }
    }
}

pub struct BrowserBuilder {
    config: BrowserConfig,
}

impl BrowserBuilder {
    pub fn new() -> Self {
        Self {
            config: BrowserConfig::default(),
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<String>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    pub fn build_config(self) -> BrowserConfig {
        self.config
    }

    pub async fn build(self) -> Result<RelayBrowser> {
        RelayBrowser::launch(&self.build_config()).await
    }
}

impl Default for BrowserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// How the populator learns the address of the finished listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStrategy {
    /// Read the page address once the form is finished.
    #[default]
    Address,
    /// Click the "copy link" control and read the clipboard. Depends on the
    /// desktop clipboard being reachable, so it is a fallback only.
    Clipboard,
}

/// Timing of the poll primitive.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_interval_ms: u64,
    /// Bound used for every bounded wait on a page element.
    pub element_timeout_ms: u64,
    /// Pause after each file input interaction.
    pub upload_pause_ms: u64,
    /// Pause between typing an address and committing the first suggestion.
    pub suggestion_pause_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            element_timeout_ms: 10_000,
            upload_pause_ms: 500,
            suggestion_pause_ms: 500,
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn upload_pause(&self) -> Duration {
        Duration::from_millis(self.upload_pause_ms)
    }

    pub fn suggestion_pause(&self) -> Duration {
        Duration::from_millis(self.suggestion_pause_ms)
    }

    /// A poller for one run, stopped by `cancel`.
    pub fn poller(&self, cancel: CancellationToken) -> Poller {
        Poller::new(self.poll_interval(), self.element_timeout(), cancel)
    }
}

/// Application settings, read from `relay.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub browser: BrowserConfig,
    /// Defaults to a visible window so the operator can finish the form by hand.
    pub populate_headless: bool,
    pub timing: TimingConfig,
    pub records_root: PathBuf,
    pub sheet_path: PathBuf,
    pub credentials_path: PathBuf,
    pub destination_url: String,
    pub result_strategy: ResultStrategy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            browser: BrowserConfig::default(),
            populate_headless: false,
            timing: TimingConfig::default(),
            records_root: PathBuf::from("data"),
            sheet_path: PathBuf::from("scraped_data.xlsx"),
            credentials_path: PathBuf::from("credentials.toml"),
            destination_url: crate::sites::destination::CREATE_URL.to_string(),
            result_strategy: ResultStrategy::Address,
        }
    }
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::ConfigError(e.to_string()))
    }

    /// Load from `path`, or fall back to defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(Error::IoError(e)),
        }
    }

    /// Browser settings for a populate run.
    pub fn populate_browser(&self) -> BrowserConfig {
        BrowserConfig {
            headless: self.populate_headless,
            ..self.browser.clone()
        }
    }
}

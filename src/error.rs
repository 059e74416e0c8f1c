use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Browser launch failed: {0}")]
    LaunchError(String),

    #[error("Navigation failed: {0}")]
    NavigationError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("JavaScript error: {0}")]
    JsError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No listing identifier found on {0}")]
    MissingIdentifier(String),

    #[error("No stored record for listing {0}")]
    RecordNotFound(String),

    #[error("No selectable option labelled {0:?}")]
    NoMatchingOption(String),

    #[error("Spreadsheet error: {0}")]
    SheetError(String),

    #[error("Stopped by user")]
    Cancelled,

    #[error("CDP error: {0}")]
    CdpError(#[from] chromiumoxide::error::CdpError),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Final result of a top-level operation, as seen by whoever started it.
#[derive(Debug)]
pub enum Outcome<T> {
    Done(T),
    Stopped,
    Failed(Error),
}

impl<T> Outcome<T> {
    /// The value on success, `None` when stopped or failed.
    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Outcome::Stopped)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Done(value),
            Err(Error::Cancelled) => Outcome::Stopped,
            Err(e) => Outcome::Failed(e),
        }
    }
}

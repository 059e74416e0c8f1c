use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::locator::Locator;

/// Snapshot of one matched element, as returned by [`Session::query_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ElementData {
    pub text: String,
    /// Requested attributes that are present on the element.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// Text of the first descendant matching each requested CSS selector.
    #[serde(default)]
    pub children: HashMap<String, String>,
}

impl ElementData {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn child(&self, selector: &str) -> Option<&str> {
        self.children.get(selector).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

/// One page of a live browser, seen through locators.
///
/// Every method is a single attempt; waiting and retrying is the caller's
/// business (see [`crate::wait::Poller`]).
#[async_trait]
pub trait Session: Send + Sync {
    /// Navigate to `url`.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Address of the currently loaded document.
    async fn current_url(&self) -> Result<String>;

    /// Number of elements currently matching `locator`.
    async fn count(&self, locator: &Locator) -> Result<usize>;

    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Empty an input or textarea.
    async fn clear(&self, locator: &Locator) -> Result<()>;

    /// Focus the element and type `text` into it.
    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()>;

    /// Send a key (e.g. "ArrowDown", "Enter") to the element.
    async fn press_key(&self, locator: &Locator, key: &str) -> Result<()>;

    /// Visible text of the first match.
    async fn text(&self, locator: &Locator) -> Result<String>;

    /// Read every match along with the given attributes and child texts.
    async fn query_all(
        &self,
        locator: &Locator,
        attributes: &[&str],
        children: &[&str],
    ) -> Result<Vec<ElementData>>;

    /// Attach local files to a file input.
    async fn set_files(&self, locator: &Locator, files: &[PathBuf]) -> Result<()>;

    /// Current system clipboard text, as seen from the page.
    async fn read_clipboard(&self) -> Result<String>;
}

use chromiumoxide::cdp::browser_protocol::dom::BackendNodeId;
use chromiumoxide::element::Element as CrElement;

use crate::error::{Error, Result};

/// Empties a form control the way a user would, so framework listeners see it.
const CLEAR_JS: &str = "function() { \
    this.focus(); \
    if ('value' in this) { this.value = ''; } \
    this.dispatchEvent(new Event('input', { bubbles: true })); \
    this.dispatchEvent(new Event('change', { bubbles: true })); \
}";

/// Wrapper around a chromiumoxide Element, providing a simplified API.
pub struct Element {
    inner: CrElement,
}

impl Element {
    pub(crate) fn new(inner: CrElement) -> Self {
        Self { inner }
    }

    pub(crate) fn backend_node_id(&self) -> BackendNodeId {
        self.inner.backend_node_id
    }

    /// Click this element (scrolls into view first).
    pub async fn click(&self) -> Result<()> {
        self.inner.click().await?;
        Ok(())
    }

    /// Focus, then type text into this element.
    pub async fn type_text(&self, text: &str) -> Result<()> {
        self.inner.focus().await?;
        self.inner.type_str(text).await?;
        Ok(())
    }

    /// Press a key on this element (e.g. "Enter", "ArrowDown").
    pub async fn press_key(&self, key: &str) -> Result<()> {
        self.inner.press_key(key).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.inner.call_js_fn(CLEAR_JS, false).await?;
        Ok(())
    }

    /// Get the inner text of this element.
    pub async fn inner_text(&self) -> Result<String> {
        self.inner
            .inner_text()
            .await?
            .ok_or_else(|| Error::ElementNotFound("inner text is empty".into()))
    }
}

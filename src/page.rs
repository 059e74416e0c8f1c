use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{GrantPermissionsParams, PermissionType};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page as CrPage;
use serde::de::DeserializeOwned;

use crate::element::Element;
use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::session::{ElementData, Session};

/// Attribute used to hand an element found by script over to a CSS lookup.
const MARK_ATTR: &str = "data-relay-target";

/// Wrapper around a chromiumoxide Page, addressed through [`Locator`]s.
pub struct Page {
    inner: CrPage,
}

impl Page {
    pub(crate) fn new(inner: CrPage) -> Self {
        Self { inner }
    }

    /// Returns a reference to the underlying chromiumoxide Page.
    pub fn inner(&self) -> &CrPage {
        &self.inner
    }

    /// Evaluate a JavaScript expression and deserialize its value.
    async fn eval<T: DeserializeOwned>(&self, expression: String) -> Result<T> {
        self.inner
            .evaluate(expression)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| Error::JsError(e.to_string()))
    }

    /// Find the first element for `locator`.
    async fn resolve(&self, locator: &Locator) -> Result<Element> {
        let found = match locator {
            Locator::Css(selector) => self.inner.find_element(selector.as_str()).await,
            Locator::XPath(expression) => self.inner.find_xpath(expression.as_str()).await,
            Locator::Text { .. } | Locator::Nth { .. } => {
                if !self.mark(locator).await? {
                    return Err(Error::ElementNotFound(locator.to_string()));
                }
                self.inner.find_element(format!("[{MARK_ATTR}]")).await
            }
        };
        found
            .map(Element::new)
            .map_err(|e| Error::ElementNotFound(format!("{locator}: {e}")))
    }

    /// Tag the first script-side match with [`MARK_ATTR`], clearing older tags.
    async fn mark(&self, locator: &Locator) -> Result<bool> {
        let js = format!(
            r#"(() => {{
                document.querySelectorAll('[{MARK_ATTR}]')
                    .forEach(e => e.removeAttribute('{MARK_ATTR}'));
                const all = {};
                if (!all.length) return false;
                all[0].setAttribute('{MARK_ATTR}', '');
                return true;
            }})()"#,
            locator.to_js_array()
        );
        self.eval(js).await
    }
}

#[async_trait]
impl Session for Page {
    async fn goto(&self, url: &str) -> Result<()> {
        self.inner
            .goto(url)
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        self.inner
            .url()
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?
            .ok_or_else(|| Error::NavigationError("No URL found".into()))
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        self.eval(format!("({}).length", locator.to_js_array())).await
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.resolve(locator).await?.click().await
    }

    async fn clear(&self, locator: &Locator) -> Result<()> {
        self.resolve(locator).await?.clear().await
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        self.resolve(locator).await?.type_text(text).await
    }

    async fn press_key(&self, locator: &Locator, key: &str) -> Result<()> {
        self.resolve(locator).await?.press_key(key).await
    }

    async fn text(&self, locator: &Locator) -> Result<String> {
        let text = self.resolve(locator).await?.inner_text().await?;
        Ok(text.trim().to_string())
    }

    async fn query_all(
        &self,
        locator: &Locator,
        attributes: &[&str],
        children: &[&str],
    ) -> Result<Vec<ElementData>> {
        let attrs_js = serde_json::to_string(attributes)?;
        let children_js = serde_json::to_string(children)?;
        let js = format!(
            r#"
            JSON.stringify(({}).map(el => {{
                const textOf = n => (n.innerText || n.textContent || '').trim();
                const attributes = {{}};
                for (const name of {attrs_js}) {{
                    let v = el.getAttribute(name);
                    if (v !== null && (name === 'src' || name === 'href') && el[name]) v = el[name];
                    if (v !== null) attributes[name] = v;
                }}
                const children = {{}};
                for (const sel of {children_js}) {{
                    const c = el.querySelector(sel);
                    if (c) children[sel] = textOf(c);
                }}
                return {{ text: textOf(el), attributes, children }};
            }}))
            "#,
            locator.to_js_array()
        );
        let json: String = self.eval(js).await?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn set_files(&self, locator: &Locator, files: &[PathBuf]) -> Result<()> {
        let el = self.resolve(locator).await?;
        let params = SetFileInputFilesParams::builder()
            .files(files.iter().map(|f| f.to_string_lossy().into_owned()))
            .backend_node_id(el.backend_node_id())
            .build()
            .map_err(Error::JsError)?;
        self.inner.execute(params).await?;
        Ok(())
    }

    async fn read_clipboard(&self) -> Result<String> {
        self.inner
            .execute(GrantPermissionsParams::new(vec![
                PermissionType::ClipboardReadWrite,
                PermissionType::ClipboardSanitizedWrite,
            ]))
            .await?;
        let params = EvaluateParams::builder()
            .expression("navigator.clipboard.readText()")
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(Error::JsError)?;
        let text: String = self
            .inner
            .evaluate_expression(params)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?
            .into_value()
            .map_err(|e| Error::JsError(e.to_string()))?;
        Ok(text.trim().to_string())
    }
}

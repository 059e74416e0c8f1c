#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use listing_relay::error::{Error, Result};
use listing_relay::{ElementData, Locator, MediaFetcher, Session, TimingConfig};
use tokio_util::sync::CancellationToken;

/// Fast timing so bounded waits on missing elements finish quickly.
pub fn quick_timing() -> TimingConfig {
    TimingConfig {
        poll_interval_ms: 10,
        element_timeout_ms: 200,
        upload_pause_ms: 0,
        suggestion_pause_ms: 0,
    }
}

pub fn element(text: &str) -> ElementData {
    ElementData {
        text: text.to_string(),
        ..Default::default()
    }
}

pub fn with_attribute(mut data: ElementData, name: &str, value: &str) -> ElementData {
    data.attributes.insert(name.to_string(), value.to_string());
    data
}

pub fn with_child(mut data: ElementData, selector: &str, text: &str) -> ElementData {
    data.children.insert(selector.to_string(), text.to_string());
    data
}

#[derive(Default)]
struct State {
    url: String,
    visits: Vec<String>,
    texts: HashMap<Locator, String>,
    clickable: HashSet<Locator>,
    inputs: HashSet<Locator>,
    lists: HashMap<Locator, Vec<ElementData>>,
    hidden_until: HashMap<Locator, Instant>,
    navigations: HashMap<Locator, String>,
    values: HashMap<Locator, String>,
    clicks: Vec<Locator>,
    keys: Vec<(Locator, String)>,
    uploads: Vec<PathBuf>,
    clipboard: String,
    cancel_after_uploads: Option<(usize, CancellationToken)>,
}

impl State {
    fn hidden(&self, locator: &Locator) -> bool {
        self.hidden_until
            .get(locator)
            .is_some_and(|until| Instant::now() < *until)
    }
}

/// In-memory page: elements exist only if registered up front.
#[derive(Default)]
pub struct FakeSession {
    state: Mutex<State>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn edit(mut self, change: impl FnOnce(&mut State)) -> Self {
        change(self.state.get_mut().unwrap());
        self
    }

    pub fn text(self, locator: Locator, text: &str) -> Self {
        self.edit(|s| {
            s.texts.insert(locator, text.to_string());
        })
    }

    pub fn clickable(self, locator: Locator) -> Self {
        self.edit(|s| {
            s.clickable.insert(locator);
        })
    }

    pub fn input(self, locator: Locator) -> Self {
        self.edit(|s| {
            s.inputs.insert(locator);
        })
    }

    pub fn list(self, locator: Locator, items: Vec<ElementData>) -> Self {
        self.edit(|s| {
            s.lists.insert(locator, items);
        })
    }

    /// A list that only shows up once `delay` has passed.
    pub fn list_after(self, locator: Locator, items: Vec<ElementData>, delay: Duration) -> Self {
        self.edit(|s| {
            s.hidden_until.insert(locator.clone(), Instant::now() + delay);
            s.lists.insert(locator, items);
        })
    }

    /// Clicking `locator` loads `url`.
    pub fn navigates(self, locator: Locator, url: &str) -> Self {
        self.edit(|s| {
            s.clickable.insert(locator.clone());
            s.navigations.insert(locator, url.to_string());
        })
    }

    pub fn clipboard(self, text: &str) -> Self {
        self.edit(|s| s.clipboard = text.to_string())
    }

    /// Fire `token` once `count` files have been attached.
    pub fn cancel_after_uploads(self, count: usize, token: CancellationToken) -> Self {
        self.edit(|s| s.cancel_after_uploads = Some((count, token)))
    }

    pub fn visits(&self) -> Vec<String> {
        self.state.lock().unwrap().visits.clone()
    }

    pub fn clicks(&self) -> Vec<Locator> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn clicked(&self, locator: &Locator) -> bool {
        self.state.lock().unwrap().clicks.contains(locator)
    }

    pub fn value(&self, locator: &Locator) -> Option<String> {
        self.state.lock().unwrap().values.get(locator).cloned()
    }

    pub fn keys(&self) -> Vec<(Locator, String)> {
        self.state.lock().unwrap().keys.clone()
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().uploads.clone()
    }
}

fn missing(locator: &Locator) -> Error {
    Error::ElementNotFound(locator.to_string())
}

#[async_trait]
impl Session for FakeSession {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.visits.push(url.to_string());
        state.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        let state = self.state.lock().unwrap();
        if state.hidden(locator) {
            return Ok(0);
        }
        let count = match state.lists.get(locator) {
            Some(items) => items.len(),
            None => usize::from(
                state.texts.contains_key(locator)
                    || state.clickable.contains(locator)
                    || state.inputs.contains(locator),
            ),
        };
        Ok(count)
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.clickable.contains(locator) {
            return Err(missing(locator));
        }
        state.clicks.push(locator.clone());
        if let Some(url) = state.navigations.get(locator).cloned() {
            state.url = url;
        }
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.inputs.contains(locator) {
            return Err(missing(locator));
        }
        state.values.insert(locator.clone(), String::new());
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.inputs.contains(locator) {
            return Err(missing(locator));
        }
        state.values.entry(locator.clone()).or_default().push_str(text);
        Ok(())
    }

    async fn press_key(&self, locator: &Locator, key: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.inputs.contains(locator) {
            return Err(missing(locator));
        }
        state.keys.push((locator.clone(), key.to_string()));
        Ok(())
    }

    async fn text(&self, locator: &Locator) -> Result<String> {
        let state = self.state.lock().unwrap();
        state.texts.get(locator).cloned().ok_or_else(|| missing(locator))
    }

    async fn query_all(
        &self,
        locator: &Locator,
        _attributes: &[&str],
        _children: &[&str],
    ) -> Result<Vec<ElementData>> {
        let state = self.state.lock().unwrap();
        if state.hidden(locator) {
            return Ok(Vec::new());
        }
        Ok(state.lists.get(locator).cloned().unwrap_or_default())
    }

    async fn set_files(&self, locator: &Locator, files: &[PathBuf]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.inputs.contains(locator) {
            return Err(missing(locator));
        }
        state.uploads.extend_from_slice(files);
        if let Some((count, token)) = &state.cancel_after_uploads {
            if state.uploads.len() >= *count {
                token.cancel();
            }
        }
        Ok(())
    }

    async fn read_clipboard(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().clipboard.clone())
    }
}

/// Serves fixed bytes for every URL it knows; anything else is a 404.
#[derive(Default)]
pub struct FakeFetcher {
    files: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn serving(urls: &[&str]) -> Self {
        Self {
            files: urls
                .iter()
                .map(|url| (url.to_string(), url.as_bytes().to_vec()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| Error::NavigationError(format!("404 {url}")))
    }
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Stored in place of any field the source page did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// Feature markers, as the source site labels them ("yes" / "no").
pub const FEATURE_YES: &str = "კი";
pub const FEATURE_NO: &str = "არა";

/// Keys of [`ListingRecord::property_details`].
pub mod detail {
    pub const TOTAL_AREA: &str = "საერთო ფართი";
    pub const ROOMS: &str = "ოთახი";
    pub const BEDROOMS: &str = "საძინებელი";
    pub const FLOOR: &str = "სართული";
    pub const FLOOR_COUNT: &str = "სართულიანობა";
}

/// Keys of [`ListingRecord::additional_info`].
pub mod info {
    pub const BATHROOMS: &str = "სველი წერტილი";
    pub const CONDITION: &str = "მდგომარეობა";
    pub const STATUS: &str = "სტატუსი";

    /// Order of the info blocks on the source page.
    pub const ORDER: [&str; 3] = [BATHROOMS, CONDITION, STATUS];
}

/// `true` if `value` carries information, i.e. it is neither empty nor the
/// "not available" marker.
pub fn is_present(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != NOT_AVAILABLE
}

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumbs {
    #[serde(default = "not_available")]
    pub category: String,
    #[serde(default = "not_available")]
    pub property_type: String,
    #[serde(default = "not_available")]
    pub transaction_type: String,
}

impl Default for Breadcrumbs {
    fn default() -> Self {
        Self {
            category: not_available(),
            property_type: not_available(),
            transaction_type: not_available(),
        }
    }
}

/// Everything extracted from one source listing. Written once by the
/// extractor, read (never modified) by the populator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(rename = "ad_id")]
    pub id: String,
    #[serde(rename = "ad_title", default = "not_available")]
    pub title: String,
    #[serde(default = "not_available")]
    pub location: String,
    /// House number split off the end of the address, empty when there was none.
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(rename = "owner_price", default = "not_available")]
    pub seller_price: String,
    #[serde(default = "not_available")]
    pub agency_price: String,
    #[serde(rename = "phone_number", default = "not_available")]
    pub phone: String,
    #[serde(default = "not_available")]
    pub name: String,
    #[serde(default = "not_available")]
    pub description: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub property_details: BTreeMap<String, String>,
    #[serde(default)]
    pub additional_info: BTreeMap<String, String>,
    #[serde(default)]
    pub breadcrumbs: Breadcrumbs,
    #[serde(default)]
    pub features: BTreeMap<String, String>,
}

impl ListingRecord {
    /// A record with every optional field set to [`NOT_AVAILABLE`].
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: not_available(),
            location: not_available(),
            number: String::new(),
            images: Vec::new(),
            seller_price: not_available(),
            agency_price: not_available(),
            phone: not_available(),
            name: not_available(),
            description: not_available(),
            comment: String::new(),
            property_details: BTreeMap::new(),
            additional_info: BTreeMap::new(),
            breadcrumbs: Breadcrumbs::default(),
            features: BTreeMap::new(),
        }
    }

    /// Present value of a property detail, `None` when absent or `N/A`.
    pub fn detail(&self, key: &str) -> Option<&str> {
        present(self.property_details.get(key))
    }

    /// Present value of an additional-info entry.
    pub fn info(&self, key: &str) -> Option<&str> {
        present(self.additional_info.get(key))
    }

    /// Names of the features marked as present, in name order.
    pub fn present_features(&self) -> impl Iterator<Item = &str> {
        self.features
            .iter()
            .filter(|(_, v)| v.as_str() == FEATURE_YES)
            .map(|(k, _)| k.as_str())
    }

    /// Street text and house number joined back together.
    pub fn full_address(&self) -> String {
        let street = if is_present(&self.location) {
            self.location.as_str()
        } else {
            ""
        };
        format!("{street} {}", self.number).trim().to_string()
    }

    pub fn to_json(&self) -> Result<String> {
        // serde_json writes non-ASCII characters as-is
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// `n` of an `{id}_{n}.{ext}` file name, so `_10` sorts after `_9`.
fn image_index(path: &Path) -> Option<u32> {
    path.file_stem()?
        .to_str()?
        .rsplit_once('_')?
        .1
        .parse()
        .ok()
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| is_present(v))
}

/// Folder layout of stored records:
/// `{root}/{id}/{id}.json` and `{root}/{id}/images/{id}_{n}.{ext}`.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    pub fn record_path(&self, id: &str) -> PathBuf {
        self.record_dir(id).join(format!("{id}.json"))
    }

    pub fn images_dir(&self, id: &str) -> PathBuf {
        self.record_dir(id).join("images")
    }

    /// Create the folders for `id`. Existing folders are reused.
    pub async fn prepare(&self, id: &str) -> Result<PathBuf> {
        if id.trim().is_empty() {
            return Err(Error::MissingIdentifier("empty identifier".into()));
        }
        let images = self.images_dir(id);
        tokio::fs::create_dir_all(&images).await?;
        Ok(images)
    }

    /// Write the record's JSON document, replacing any earlier one.
    pub async fn save(&self, record: &ListingRecord) -> Result<PathBuf> {
        self.prepare(&record.id).await?;
        let path = self.record_path(&record.id);
        tokio::fs::write(&path, record.to_json()?).await?;
        Ok(path)
    }

    pub async fn load(&self, id: &str) -> Result<ListingRecord> {
        let path = self.record_path(id);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::RecordNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        ListingRecord::from_json(&text)
    }

    /// Image files stored for `id`, in image-number order. Only png and jpeg files count.
    pub async fn image_files(&self, id: &str) -> Result<Vec<PathBuf>> {
        let dir = self.images_dir(id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                .unwrap_or(false);
            if is_image {
                files.push(std::path::absolute(&path).unwrap_or(path));
            }
        }
        files.sort_by(|a, b| (image_index(a), a).cmp(&(image_index(b), b)));
        Ok(files)
    }

    /// Identifiers with a folder under the root, sorted.
    pub async fn known_ids(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

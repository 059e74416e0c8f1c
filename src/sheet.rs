//! The operator's tracking sheet: one row per listing handled.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use calamine::{open_workbook, Reader, Xlsx, XlsxError};
use rust_xlsxwriter::Workbook;

use crate::error::{Error, Result};
use crate::record::{detail, ListingRecord, NOT_AVAILABLE};

pub const TIMESTAMP: &str = "Uploaded Timestamp";
pub const OWNER_ID: &str = "მესაკუთრის ID";
pub const PHONE: &str = "ტელეფონის ნომერი";
pub const ROOMS: &str = "ოთახი";
pub const FLOOR: &str = "სართული";
pub const ADDRESS: &str = "მისამართი";
pub const AGENCY_PRICE: &str = "სააგენტოს ფასი";
pub const OWNER_PRICE: &str = "მესაკუთრის ფასი";
pub const COMMENT: &str = "Comment";
/// Link of the published listing.
pub const LINK: &str = "ss.ge";

pub const DEFAULT_HEADERS: [&str; 10] = [
    TIMESTAMP,
    OWNER_ID,
    PHONE,
    ROOMS,
    FLOOR,
    ADDRESS,
    AGENCY_PRICE,
    OWNER_PRICE,
    COMMENT,
    LINK,
];

/// Timestamp cell of a row that was extracted but not published.
pub const SCRAPE_ONLY: &str = "SCRAPE ONLY";

/// Rows keyed by listing identifier, addressed by exact header text.
#[async_trait]
pub trait RecordSheet: Send + Sync {
    /// Add a row for `id` with the given cells. Headers not yet in the sheet are added.
    async fn append_row(&mut self, id: &str, cells: &[(&str, String)]) -> Result<()>;

    /// Set `header` in the row of `id`, adding the column if absent.
    async fn update_column(&mut self, id: &str, header: &str, value: &str) -> Result<()>;

    /// Cell value, `None` when the row or column does not exist.
    fn value(&self, id: &str, header: &str) -> Option<String>;
}

/// Cells describing `record`, with `timestamp` in the timestamp column.
pub fn record_row(record: &ListingRecord, timestamp: &str) -> Vec<(&'static str, String)> {
    let or_missing = |value: Option<&str>| value.unwrap_or(NOT_AVAILABLE).to_string();
    vec![
        (TIMESTAMP, timestamp.to_string()),
        (PHONE, record.phone.clone()),
        (ROOMS, or_missing(record.detail(detail::ROOMS))),
        (FLOOR, or_missing(record.detail(detail::FLOOR))),
        (ADDRESS, record.full_address()),
        (AGENCY_PRICE, record.agency_price.clone()),
        (OWNER_PRICE, record.seller_price.clone()),
        (COMMENT, record.comment.clone()),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SheetData {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Default for SheetData {
    fn default() -> Self {
        Self {
            headers: DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

impl SheetData {
    /// First worksheet of the workbook at `path`: header row, then data rows.
    fn read(path: &Path) -> Result<Self> {
        if !path.try_exists()? {
            return Ok(Self::default());
        }
        let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e: XlsxError| {
            Error::SheetError(format!("cannot open {}: {e}", path.display()))
        })?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::SheetError(format!("{} has no worksheet", path.display())))?
            .map_err(|e| Error::SheetError(format!("cannot read {}: {e}", path.display())))?;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());
        let Some(headers) = rows.next().filter(|h| h.iter().any(|cell| !cell.is_empty())) else {
            return Ok(Self::default());
        };
        Ok(Self {
            headers,
            rows: rows.collect(),
        })
    }

    /// Rewrite the whole workbook. Every cell is stored as text.
    fn write(&self, path: &Path) -> Result<()> {
        let sheet_error = |e: rust_xlsxwriter::XlsxError| {
            Error::SheetError(format!("cannot write {}: {e}", path.display()))
        };
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (col, header) in self.headers.iter().enumerate() {
            worksheet.write_string(0, col as u16, header).map_err(sheet_error)?;
        }
        for (r, row) in self.rows.iter().enumerate() {
            for (col, cell) in row.iter().enumerate().filter(|(_, cell)| !cell.is_empty()) {
                worksheet
                    .write_string(r as u32 + 1, col as u16, cell)
                    .map_err(sheet_error)?;
            }
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        workbook.save(path).map_err(sheet_error)
    }

    fn column(&mut self, header: &str) -> usize {
        match self.headers.iter().position(|h| h == header) {
            Some(idx) => idx,
            None => {
                self.headers.push(header.to_string());
                self.headers.len() - 1
            }
        }
    }

    fn find_column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Latest row for `id`.
    fn row_of(&self, id: &str) -> Option<usize> {
        let key = self.find_column(OWNER_ID)?;
        self.rows
            .iter()
            .rposition(|row| row.get(key).is_some_and(|cell| cell == id))
    }

    fn set(&mut self, row: usize, column: usize, value: &str) {
        let cells = &mut self.rows[row];
        if cells.len() <= column {
            cells.resize(column + 1, String::new());
        }
        cells[column] = value.to_string();
    }
}

/// [`RecordSheet`] kept in an `.xlsx` workbook, rewritten after every change.
/// File access runs on the blocking pool.
#[derive(Debug)]
pub struct XlsxSheet {
    path: PathBuf,
    data: SheetData,
}

impl XlsxSheet {
    /// Open `path`, starting an empty sheet with the default headers if it
    /// does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let source = path.clone();
        let data = tokio::task::spawn_blocking(move || SheetData::read(&source)).await??;
        tracing::debug!(sheet = %path.display(), rows = data.rows.len(), "sheet opened");
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &[String] {
        &self.data.headers
    }

    pub fn len(&self) -> usize {
        self.data.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.rows.is_empty()
    }

    async fn save(&self) -> Result<()> {
        let data = self.data.clone();
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || data.write(&path)).await?
    }
}

#[async_trait]
impl RecordSheet for XlsxSheet {
    async fn append_row(&mut self, id: &str, cells: &[(&str, String)]) -> Result<()> {
        self.data.rows.push(Vec::new());
        let row = self.data.rows.len() - 1;
        let key = self.data.column(OWNER_ID);
        self.data.set(row, key, id);
        for (header, value) in cells {
            let column = self.data.column(header);
            self.data.set(row, column, value);
        }
        self.save().await?;
        tracing::debug!(id, sheet = %self.path.display(), "row appended");
        Ok(())
    }

    async fn update_column(&mut self, id: &str, header: &str, value: &str) -> Result<()> {
        let row = self
            .data
            .row_of(id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))?;
        let column = self.data.column(header);
        self.data.set(row, column, value);
        self.save().await?;
        tracing::debug!(id, header, "sheet cell updated");
        Ok(())
    }

    fn value(&self, id: &str, header: &str) -> Option<String> {
        let row = self.data.row_of(id)?;
        let column = self.data.find_column(header)?;
        self.data.rows[row].get(column).cloned()
    }
}

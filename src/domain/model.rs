use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Persisted marker format, always UTC.
pub const MARKER_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Worksheet positions in the content spreadsheet.
pub const ABOUT_WORKSHEET: usize = 0;
pub const PHOTOS_WORKSHEET: usize = 1;
pub const RECORDINGS_WORKSHEET: usize = 2;
pub const RESUME_WORKSHEET: usize = 3;
pub const ENGAGEMENTS_WORKSHEET: usize = 4;

/// Number of `--` rows separating the four photo bands.
pub const PHOTO_BAND_MARKERS: usize = 3;

/// One worksheet row, cells in column order.
pub type Row = Vec<String>;

/// 第一次執行時使用的哨兵時間，任何檔案都比它新
pub fn sentinel_marker() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

pub fn format_marker(ts: &NaiveDateTime) -> String {
    ts.format(MARKER_FORMAT).to_string()
}

pub fn parse_marker(raw: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw.trim(), MARKER_FORMAT)
}

#[derive(Debug, Error)]
pub enum MarkerReadError {
    #[error("marker not found")]
    Missing,
    #[error("marker unreadable: {0}")]
    Io(#[from] std::io::Error),
    #[error("marker '{raw}' is not a {MARKER_FORMAT} timestamp: {source}")]
    Parse {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// One band of the photo grid. Each row is a `[path, caption]` pair so
/// templates can unpack it with `{% for path, caption in band %}`.
pub type PhotoBand = Vec<Row>;

/// Cells in a photo row: image path, then caption.
pub const PHOTO_ROW_WIDTH: usize = 2;

/// Normalizes a photos-worksheet row to exactly `[path, caption]`.
pub fn photo_pair(row: &[String]) -> Row {
    (0..PHOTO_ROW_WIDTH)
        .map(|i| row.get(i).cloned().unwrap_or_default())
        .collect()
}

/// 把每一列補空字串到工作表最寬的欄數，範本才能用固定索引取值
pub fn pad_rows(rows: &mut [Row]) {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in rows.iter_mut() {
        row.resize(width, String::new());
    }
}

/// Everything the page template can reference.
#[derive(Debug, Clone, Serialize)]
pub struct ContentSections {
    pub about_text: String,
    pub photo_set: Vec<PhotoBand>,
    pub recordings: Vec<Row>,
    pub resume: Vec<Row>,
    pub engagements: Vec<Row>,
    pub timestamp: String,
    pub year: String,
}

/// A file matched by an include pattern but left out of the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAsset {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    /// Destination keys actually transferred, in upload order.
    pub uploaded: Vec<String>,
    pub skipped: Vec<SkippedAsset>,
    /// Matched files that were not stale.
    pub unchanged: usize,
}

impl PublishReport {
    pub fn uploaded_count(&self) -> usize {
        self.uploaded.len()
    }

    pub fn summary(&self) -> String {
        format!("{} files uploaded", self.uploaded.len())
    }
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub placeholders_generated: usize,
    pub stylesheets_compiled: usize,
    pub page: PathBuf,
    pub page_changed: bool,
    /// `None` when the build ran without `--deploy`.
    pub publish: Option<PublishReport>,
}

impl BuildReport {
    pub fn files_uploaded(&self) -> usize {
        self.publish.as_ref().map_or(0, PublishReport::uploaded_count)
    }
}

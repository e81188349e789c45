use crate::domain::model::{
    photo_pair, PhotoBand, Row, ABOUT_WORKSHEET, ENGAGEMENTS_WORKSHEET, PHOTOS_WORKSHEET,
    PHOTO_BAND_MARKERS, RECORDINGS_WORKSHEET, RESUME_WORKSHEET,
};
use crate::domain::ports::ContentSource;
use crate::utils::error::{Result, SiteError};

/// Prefix of a first cell that separates two photo bands.
pub const BAND_MARKER_PREFIX: &str = "--";

/// Everything pulled from the spreadsheet for one render.
#[derive(Debug, Clone)]
pub struct SiteContent {
    pub about_text: String,
    pub photo_set: Vec<PhotoBand>,
    pub recordings: Vec<Row>,
    pub resume: Vec<Row>,
    pub engagements: Vec<Row>,
}

/// 從試算表讀取內容並整理成模板需要的結構
pub struct ContentAggregator<'a> {
    source: &'a dyn ContentSource,
}

impl<'a> ContentAggregator<'a> {
    pub fn new(source: &'a dyn ContentSource) -> Self {
        Self { source }
    }

    pub async fn about_text(&self) -> Result<String> {
        let rows = self.source.worksheet(ABOUT_WORKSHEET).await?;
        rows.first()
            .and_then(|row| row.first())
            .filter(|cell| !cell.trim().is_empty())
            .cloned()
            .ok_or_else(|| SiteError::ContentSourceEmpty {
                worksheet: ABOUT_WORKSHEET,
                what: "about text (cell A1)".to_string(),
            })
    }

    pub async fn photos(&self) -> Result<Vec<PhotoBand>> {
        let rows = self.source.worksheet(PHOTOS_WORKSHEET).await?;
        split_photo_bands(&rows)
    }

    pub async fn recordings(&self) -> Result<Vec<Row>> {
        self.source.worksheet(RECORDINGS_WORKSHEET).await
    }

    pub async fn resume(&self) -> Result<Vec<Row>> {
        self.source.worksheet(RESUME_WORKSHEET).await
    }

    pub async fn engagements(&self) -> Result<Vec<Row>> {
        self.source.worksheet(ENGAGEMENTS_WORKSHEET).await
    }

    /// Fetches all five worksheets in order; the first failure wins.
    pub async fn collect(&self) -> Result<SiteContent> {
        let about_text = self.about_text().await?;
        let photo_set = self.photos().await?;
        let recordings = self.recordings().await?;
        let resume = self.resume().await?;
        let engagements = self.engagements().await?;

        tracing::info!(
            "📋 Content fetched: {} photo bands ({} photos), {} recordings, {} resume rows, {} engagements",
            photo_set.len(),
            photo_set.iter().map(Vec::len).sum::<usize>(),
            recordings.len(),
            resume.len(),
            engagements.len()
        );

        Ok(SiteContent {
            about_text,
            photo_set,
            recordings,
            resume,
            engagements,
        })
    }
}

fn is_band_marker(row: &[String]) -> bool {
    row.first()
        .is_some_and(|cell| cell.starts_with(BAND_MARKER_PREFIX))
}

/// Splits the photos worksheet into four bands at the `--` marker rows.
///
/// With markers at `i < j < k` the bands are `[0, i)`, `(i, j)`, `(j, k)` and
/// `(k, end)`; the marker rows themselves are dropped. Any marker count other
/// than three is rejected.
pub fn split_photo_bands(rows: &[Row]) -> Result<Vec<PhotoBand>> {
    let markers: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| is_band_marker(row))
        .map(|(i, _)| i)
        .collect();

    if markers.len() != PHOTO_BAND_MARKERS {
        return Err(SiteError::MalformedContent {
            worksheet: PHOTOS_WORKSHEET,
            expected: PHOTO_BAND_MARKERS,
            actual: markers.len(),
        });
    }

    let mut bands = Vec::with_capacity(PHOTO_BAND_MARKERS + 1);
    let mut start = 0;
    for &marker in &markers {
        bands.push(to_band(&rows[start..marker]));
        start = marker + 1;
    }
    bands.push(to_band(&rows[start..]));

    Ok(bands)
}

fn to_band(rows: &[Row]) -> PhotoBand {
    rows.iter().map(|row| photo_pair(row)).collect()
}

use crate::domain::model::{pad_rows, Row};
use crate::domain::ports::ContentSource;
use crate::utils::error::{Result, SiteError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Offline content: worksheet `n` lives in `<dir>/<n>.csv`, no header row.
#[derive(Debug, Clone)]
pub struct CsvWorkbookSource {
    dir: PathBuf,
}

impl CsvWorkbookSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn worksheet_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.csv", index))
    }

    fn read_rows(path: &Path) -> std::result::Result<Vec<Row>, String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| e.to_string())?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| e.to_string())?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        pad_rows(&mut rows);
        Ok(rows)
    }
}

#[async_trait]
impl ContentSource for CsvWorkbookSource {
    async fn worksheet(&self, index: usize) -> Result<Vec<Row>> {
        let path = self.worksheet_path(index);
        let rows = tokio::task::spawn_blocking({
            let path = path.clone();
            move || Self::read_rows(&path)
        })
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r)
        .map_err(|message| SiteError::ContentSourceUnavailable {
            worksheet: index,
            message: format!("{}: {}", path.display(), message),
        })?;

        tracing::debug!("📄 Worksheet {} ({}): {} rows", index, path.display(), rows.len());
        Ok(rows)
    }
}

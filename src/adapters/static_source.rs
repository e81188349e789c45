use crate::domain::model::Row;
use crate::domain::ports::ContentSource;
use crate::utils::error::{Result, SiteError};
use async_trait::async_trait;
use std::collections::HashMap;

/// Worksheets held in memory. Used for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticContentSource {
    worksheets: HashMap<usize, Vec<Row>>,
}

impl StaticContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_worksheet(mut self, index: usize, rows: Vec<Row>) -> Self {
        self.worksheets.insert(index, rows);
        self
    }
}

#[async_trait]
impl ContentSource for StaticContentSource {
    async fn worksheet(&self, index: usize) -> Result<Vec<Row>> {
        self.worksheets
            .get(&index)
            .cloned()
            .ok_or_else(|| SiteError::ContentSourceUnavailable {
                worksheet: index,
                message: "worksheet not loaded".to_string(),
            })
    }
}

use crate::domain::model::{MarkerReadError, Row};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::Path;

/// Destination for published assets.
pub trait Storage: Send + Sync {
    fn upload_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Human readable target, used in logs.
    fn describe(&self) -> String;
}

/// Tabular content addressed by worksheet position.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn worksheet(&self, index: usize) -> Result<Vec<Row>>;
}

/// Durable home of the freshness marker.
pub trait MarkerStore: Send + Sync {
    fn get(&self) -> std::result::Result<NaiveDateTime, MarkerReadError>;
    fn set(&self, ts: NaiveDateTime) -> Result<()>;
}

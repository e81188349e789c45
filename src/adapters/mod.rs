// Adapters layer: concrete implementations of the domain ports
// (content sources, storage backends, marker stores).

pub mod csv_source;
pub mod marker;
pub mod repo;
pub mod sheets;
pub mod static_source;
pub mod storage;

use crate::config::credentials::Credentials;
use crate::config::site::{ContentSourceKind, SiteConfig};
use crate::domain::ports::ContentSource;
use crate::utils::error::{Result, SiteError};
use std::path::Path;
use std::time::Duration;

/// Builds the content source named by `[content] source`.
pub fn content_source(
    root: &Path,
    config: &SiteConfig,
    credentials: &Credentials,
) -> Result<Box<dyn ContentSource>> {
    match config.content.source {
        ContentSourceKind::Sheets => {
            let key = credentials
                .sheets
                .clone()
                .ok_or_else(|| SiteError::MissingConfigError {
                    field: "sheets_creds".to_string(),
                })?;
            let tokens = Box::new(sheets::ServiceAccountTokenProvider::new(key));
            let timeout = Duration::from_secs(config.content.timeout_seconds);
            let source = if config.content.spreadsheet_id.trim().is_empty() {
                sheets::SheetsApiSource::by_title(
                    &config.content.api_base,
                    &config.content.drive_api_base,
                    config.content.spreadsheet_title.clone(),
                    tokens,
                    timeout,
                )?
            } else {
                sheets::SheetsApiSource::new(
                    &config.content.api_base,
                    config.content.spreadsheet_id.clone(),
                    tokens,
                    timeout,
                )?
            };
            Ok(Box::new(source))
        }
        ContentSourceKind::Csv => Ok(Box::new(csv_source::CsvWorkbookSource::new(
            root.join(&config.content.csv_dir),
        ))),
    }
}

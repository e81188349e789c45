//! Google Sheets REST source.
//!
//! Worksheets are addressed by position: the spreadsheet metadata is fetched
//! once to map positions to titles, then each worksheet is read through the
//! `values` endpoint.

use crate::config::credentials::ServiceAccountKey;
use crate::domain::model::{pad_rows, Row};
use crate::domain::ports::ContentSource;
use crate::utils::error::{Result, SiteError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};
use url::Url;

pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
/// Needed to look a spreadsheet up by title.
pub const DRIVE_METADATA_SCOPE: &str = "https://www.googleapis.com/auth/drive.metadata.readonly";

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// Lifetime requested for a service-account assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh a cached token this long before it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self, client: &Client) -> std::result::Result<String, String>;
}

/// A pre-issued bearer token.
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self, _client: &Client) -> std::result::Result<String, String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// JWT-bearer grant with a service-account key; tokens are cached until
/// shortly before they expire.
pub struct ServiceAccountTokenProvider {
    key: ServiceAccountKey,
    scope: String,
    cached: Mutex<Option<(String, Instant)>>,
}

impl ServiceAccountTokenProvider {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            scope: format!("{} {}", SHEETS_READONLY_SCOPE, DRIVE_METADATA_SCOPE),
            cached: Mutex::new(None),
        }
    }

    pub fn signed_assertion(&self, now: i64) -> std::result::Result<String, String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let signing_key = jsonwebtoken::EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| format!("service account private key is unusable: {}", e))?;
        jsonwebtoken::encode(&header, &claims, &signing_key)
            .map_err(|e| format!("failed to sign token request: {}", e))
    }
}

#[async_trait]
impl AccessTokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self, client: &Client) -> std::result::Result<String, String> {
        let mut cached = self.cached.lock().await;
        if let Some((token, expires)) = cached.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < *expires {
                return Ok(token.clone());
            }
        }

        let assertion = self.signed_assertion(chrono::Utc::now().timestamp())?;
        let response = client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| describe_request_error(&e))?;

        if !response.status().is_success() {
            return Err(format!("token endpoint returned {}", response.status()));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| format!("token response unreadable: {}", e))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        *cached = Some((token.access_token.clone(), Instant::now() + lifetime));
        tracing::debug!("🔑 Obtained spreadsheet access token for {}", self.key.client_email);
        Ok(token.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {}", e)
    } else {
        format!("request failed: {}", e)
    }
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A1 range selecting a whole worksheet by title.
fn sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

/// Drive search expression for a spreadsheet with this exact title.
fn title_query(title: &str) -> String {
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        title.replace('\\', "\\\\").replace('\'', "\\'"),
        SPREADSHEET_MIME_TYPE
    )
}

/// How the spreadsheet is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetRef {
    Id(String),
    /// Looked up through the Drive API; the first match wins.
    Title { title: String, drive_base: Url },
}

pub struct SheetsApiSource {
    client: Client,
    api_base: Url,
    spreadsheet: SpreadsheetRef,
    tokens: Box<dyn AccessTokenProvider>,
    spreadsheet_id: OnceCell<String>,
    titles: OnceCell<Vec<String>>,
}

fn parse_base(field: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| SiteError::InvalidConfigValueError {
        field: field.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn join_segments(base: &Url, segments: &[&str]) -> std::result::Result<Url, String> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| format!("{} cannot be a base URL", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

impl SheetsApiSource {
    pub fn new(
        api_base: &str,
        spreadsheet_id: impl Into<String>,
        tokens: Box<dyn AccessTokenProvider>,
        timeout: Duration,
    ) -> Result<Self> {
        Self::with_ref(
            api_base,
            SpreadsheetRef::Id(spreadsheet_id.into()),
            tokens,
            timeout,
        )
    }

    /// Opens the spreadsheet by its title, resolving the id on first use.
    pub fn by_title(
        api_base: &str,
        drive_base: &str,
        title: impl Into<String>,
        tokens: Box<dyn AccessTokenProvider>,
        timeout: Duration,
    ) -> Result<Self> {
        let spreadsheet = SpreadsheetRef::Title {
            title: title.into(),
            drive_base: parse_base("content.drive_api_base", drive_base)?,
        };
        Self::with_ref(api_base, spreadsheet, tokens, timeout)
    }

    fn with_ref(
        api_base: &str,
        spreadsheet: SpreadsheetRef,
        tokens: Box<dyn AccessTokenProvider>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_base = parse_base("content.api_base", api_base)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SiteError::ConfigError {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        let spreadsheet_id = match &spreadsheet {
            SpreadsheetRef::Id(id) => OnceCell::new_with(Some(id.clone())),
            SpreadsheetRef::Title { .. } => OnceCell::new(),
        };

        Ok(Self {
            client,
            api_base,
            spreadsheet,
            tokens,
            spreadsheet_id,
            titles: OnceCell::new(),
        })
    }

    fn endpoint(&self, spreadsheet_id: &str, extra: &[&str]) -> std::result::Result<Url, String> {
        let mut segments = vec!["v4", "spreadsheets", spreadsheet_id];
        segments.extend_from_slice(extra);
        join_segments(&self.api_base, &segments)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> std::result::Result<T, String> {
        let token = self
            .tokens
            .access_token(&self.client)
            .await
            .map_err(|e| format!("authentication failed: {}", e))?;

        tracing::debug!("Making spreadsheet request to: {}", url);
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| describe_request_error(&e))?;

        tracing::debug!("Spreadsheet response status: {}", response.status());
        if !response.status().is_success() {
            return Err(format!("spreadsheet API returned {}", response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| format!("unexpected response body: {}", e))
    }

    async fn spreadsheet_id(&self, worksheet: usize) -> Result<&String> {
        self.spreadsheet_id
            .get_or_try_init(|| async {
                let unavailable = |message| SiteError::ContentSourceUnavailable { worksheet, message };
                let SpreadsheetRef::Title { title, drive_base } = &self.spreadsheet else {
                    return Err(unavailable("spreadsheet id missing".to_string()));
                };

                let url = join_segments(drive_base, &["drive", "v3", "files"]).map_err(unavailable)?;
                let query = title_query(title);
                let list: DriveFileList = self
                    .get_json(url, &[("q", query.as_str()), ("fields", "files(id,name)")])
                    .await
                    .map_err(unavailable)?;

                let file = list.files.into_iter().next().ok_or_else(|| {
                    unavailable(format!("no spreadsheet titled '{}' is shared with the service account", title))
                })?;
                tracing::info!("📗 Spreadsheet '{}' resolved to {}", title, file.id);
                Ok(file.id)
            })
            .await
    }

    async fn titles(&self, worksheet: usize) -> Result<&Vec<String>> {
        let spreadsheet_id = self.spreadsheet_id(worksheet).await?;
        self.titles
            .get_or_try_init(|| async {
                let url = self
                    .endpoint(spreadsheet_id, &[])
                    .map_err(|message| SiteError::ContentSourceUnavailable { worksheet, message })?;
                let meta: SpreadsheetMeta = self
                    .get_json(url, &[("fields", "sheets.properties(title,index)")])
                    .await
                    .map_err(|message| SiteError::ContentSourceUnavailable { worksheet, message })?;

                let mut sheets: Vec<SheetProperties> =
                    meta.sheets.into_iter().map(|s| s.properties).collect();
                sheets.sort_by_key(|p| p.index);
                Ok(sheets.into_iter().map(|p| p.title).collect())
            })
            .await
    }
}

#[async_trait]
impl ContentSource for SheetsApiSource {
    async fn worksheet(&self, index: usize) -> Result<Vec<Row>> {
        let spreadsheet_id = self.spreadsheet_id(index).await?;
        let titles = self.titles(index).await?;
        let title = titles
            .get(index)
            .ok_or_else(|| SiteError::ContentSourceUnavailable {
                worksheet: index,
                message: format!("spreadsheet has only {} worksheets", titles.len()),
            })?;

        let range = sheet_range(title);
        let url = self
            .endpoint(spreadsheet_id, &["values", range.as_str()])
            .map_err(|message| SiteError::ContentSourceUnavailable {
                worksheet: index,
                message,
            })?;
        let values: ValueRange = self
            .get_json(
                url,
                &[
                    ("majorDimension", "ROWS"),
                    ("valueRenderOption", "FORMATTED_VALUE"),
                ],
            )
            .await
            .map_err(|message| SiteError::ContentSourceUnavailable {
                worksheet: index,
                message: format!("{} ({})", message, title),
            })?;

        // API 會省略列尾的空白儲存格
        let mut rows: Vec<Row> = values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        pad_rows(&mut rows);
        tracing::debug!("📄 Worksheet {} ({}): {} rows", index, title, rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_range_quotes_titles() {
        assert_eq!(sheet_range("About"), "'About'");
        assert_eq!(sheet_range("Linda's Photos"), "'Linda''s Photos'");
    }

    #[test]
    fn test_cells_become_strings() {
        assert_eq!(cell_to_string(serde_json::json!("x")), "x");
        assert_eq!(cell_to_string(serde_json::json!(2020)), "2020");
        assert_eq!(cell_to_string(serde_json::Value::Null), "");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let source = SheetsApiSource::new(
            "http://127.0.0.1:9/mock/",
            "sheet-id",
            Box::new(StaticToken("t".into())),
            Duration::from_secs(5),
        )
        .unwrap();
        let url = source.endpoint("sheet-id", &["values", "'About'"]).unwrap();
        assert_eq!(url.path(), "/mock/v4/spreadsheets/sheet-id/values/'About'");
    }

    #[test]
    fn test_title_query_escapes_quotes() {
        assert_eq!(
            title_query("Linda's Content"),
            "name = 'Linda\\'s Content' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false"
        );
    }

    #[test]
    fn test_bad_private_key_is_reported() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email":"a@b.c","private_key":"not a pem"}"#,
        )
        .unwrap();
        let provider = ServiceAccountTokenProvider::new(key);
        let err = provider.signed_assertion(1_700_000_000).unwrap_err();
        assert!(err.contains("private key"));
    }
}

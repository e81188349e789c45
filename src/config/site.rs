use crate::core::freshness::FreshnessPolicy;
use crate::core::gallery::PlaceholderOptions;
use crate::core::publish::{FailurePolicy, PublishOptions};
use crate::core::render::DisplayZone;
use crate::core::styles::StyleOptions;
use crate::utils::error::{Result, SiteError};
use crate::utils::validation::{self, Validate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file looked up under the site root.
pub const DEFAULT_CONFIG_FILE: &str = "site.toml";

/// 網站建置設定，所有欄位都有預設值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub site: SiteSection,
    pub freshness: FreshnessSection,
    pub content: ContentSection,
    pub render: RenderSection,
    pub gallery: GallerySection,
    pub styles: StylesSection,
    pub publish: PublishSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    pub template: String,
    pub output: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            template: "index_template.html".to_string(),
            output: "index.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessSection {
    pub marker_file: String,
    /// Unset means "use the deployment target's default".
    pub policy: Option<FreshnessPolicy>,
}

impl Default for FreshnessSection {
    fn default() -> Self {
        Self {
            marker_file: "ts.txt".to_string(),
            policy: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSourceKind {
    /// Google Sheets REST API with a service account.
    Sheets,
    /// One CSV file per worksheet (`<csv_dir>/<index>.csv`).
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSection {
    pub source: ContentSourceKind,
    /// Takes precedence over `spreadsheet_title` when set.
    pub spreadsheet_id: String,
    pub spreadsheet_title: String,
    pub api_base: String,
    /// Drive API used to find the spreadsheet by title.
    pub drive_api_base: String,
    pub csv_dir: String,
    pub timeout_seconds: u64,
}

impl Default for ContentSection {
    fn default() -> Self {
        Self {
            source: ContentSourceKind::Sheets,
            spreadsheet_id: String::new(),
            spreadsheet_title: "Website Content".to_string(),
            api_base: "https://sheets.googleapis.com".to_string(),
            drive_api_base: "https://www.googleapis.com".to_string(),
            csv_dir: "content".to_string(),
            timeout_seconds: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSection {
    /// IANA zone of the displayed "last updated" stamp, e.g. `US/Pacific`.
    pub timezone: String,
    pub timezone_label: String,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            timezone: "US/Pacific".to_string(),
            timezone_label: "PDT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GallerySection {
    pub pattern: String,
    pub placeholder_prefix: String,
    pub width: u32,
    pub height: u32,
}

impl Default for GallerySection {
    fn default() -> Self {
        Self {
            pattern: "include/images/gallery/*.jpg".to_string(),
            placeholder_prefix: "__".to_string(),
            width: 12,
            height: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StylesSection {
    pub enabled: bool,
    pub input_dir: String,
    pub output_dir: String,
    pub sources: Vec<String>,
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            enabled: true,
            input_dir: "sass".to_string(),
            output_dir: "include/css".to_string(),
            sources: vec!["style.scss".to_string(), "bootstrap.scss".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishSection {
    pub bucket: String,
    pub region: String,
    pub prefix: String,
    pub include: Vec<String>,
    pub on_failure: FailurePolicy,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for PublishSection {
    fn default() -> Self {
        Self {
            bucket: "lindabairdmezzo.com".to_string(),
            region: "us-east-1".to_string(),
            prefix: String::new(),
            include: [
                "index.html",
                "favicon.ico",
                "include/css/*.css",
                "include/js/*.js",
                "include/images/*.jpg",
                "include/images/header/*.jpg",
                "include/fonts/bootstrap/*",
                "include/fonts/icomoon/*",
                "include/fonts/simple-line-icons/*",
                "include/images/gallery/*.jpg",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            on_failure: FailurePolicy::Abort,
            max_retries: 0,
            retry_delay_ms: 500,
            timeout_seconds: 30,
        }
    }
}

impl SiteConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(&path).map_err(|e| SiteError::file(path.as_ref(), e))?;
        Self::from_toml_str(&content)
    }

    /// 先替換 `${VAR}` 環境變數再解析 TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        toml::from_str(&processed).map_err(|e| SiteError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Loads `explicit` if given, else `<root>/site.toml` if present, else defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            return Self::from_file(path);
        }

        let candidate = root.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            tracing::info!("📁 Loading configuration from: {}", candidate.display());
            Self::from_file(candidate)
        } else {
            tracing::info!("📁 No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
            Ok(Self::default())
        }
    }

    pub fn display_zone(&self) -> Result<DisplayZone> {
        let zone: Tz =
            self.render
                .timezone
                .parse()
                .map_err(|e| SiteError::InvalidConfigValueError {
                    field: "render.timezone".to_string(),
                    value: self.render.timezone.clone(),
                    reason: format!("expected an IANA zone like US/Pacific ({})", e),
                })?;
        Ok(DisplayZone {
            zone,
            label: self.render.timezone_label.clone(),
        })
    }

    pub fn placeholder_options(&self) -> PlaceholderOptions {
        PlaceholderOptions {
            pattern: self.gallery.pattern.clone(),
            prefix: self.gallery.placeholder_prefix.clone(),
            width: self.gallery.width,
            height: self.gallery.height,
        }
    }

    pub fn style_options(&self) -> StyleOptions {
        StyleOptions {
            enabled: self.styles.enabled,
            input_dir: self.styles.input_dir.clone(),
            output_dir: self.styles.output_dir.clone(),
            sources: self.styles.sources.clone(),
        }
    }

    pub fn publish_options(&self) -> PublishOptions {
        PublishOptions {
            include: self.publish.include.clone(),
            prefix: self.publish.prefix.clone(),
            on_failure: self.publish.on_failure,
            max_retries: self.publish.max_retries,
            retry_delay: Duration::from_millis(self.publish.retry_delay_ms),
        }
    }

    /// Effective freshness policy: the config value, or the target's default.
    pub fn freshness_policy(&self, target_default: FreshnessPolicy) -> FreshnessPolicy {
        self.freshness.policy.unwrap_or(target_default)
    }
}

fn substitute_env_vars(content: &str) -> Result<String> {
    use regex::Regex;
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| SiteError::ConfigError {
        message: format!("env substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

impl Validate for SiteConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_relative_path("site.template", &self.site.template)?;
        validation::validate_relative_path("site.output", &self.site.output)?;
        validation::validate_relative_path("freshness.marker_file", &self.freshness.marker_file)?;

        match self.content.source {
            ContentSourceKind::Sheets => {
                if self.content.spreadsheet_id.trim().is_empty() {
                    validation::validate_non_empty_string(
                        "content.spreadsheet_title",
                        &self.content.spreadsheet_title,
                    )?;
                    validation::validate_url("content.drive_api_base", &self.content.drive_api_base)?;
                }
                validation::validate_url("content.api_base", &self.content.api_base)?;
            }
            ContentSourceKind::Csv => {
                validation::validate_relative_path("content.csv_dir", &self.content.csv_dir)?;
            }
        }
        validation::validate_range("content.timeout_seconds", self.content.timeout_seconds, 1, 300)?;

        self.display_zone()?;

        validation::validate_glob_pattern("gallery.pattern", &self.gallery.pattern)?;
        validation::validate_non_empty_string(
            "gallery.placeholder_prefix",
            &self.gallery.placeholder_prefix,
        )?;
        validation::validate_range("gallery.width", self.gallery.width, 1, 4096)?;
        validation::validate_range("gallery.height", self.gallery.height, 1, 4096)?;

        if self.styles.enabled {
            validation::validate_relative_path("styles.input_dir", &self.styles.input_dir)?;
            validation::validate_relative_path("styles.output_dir", &self.styles.output_dir)?;
        }

        validation::validate_s3_bucket_name("publish.bucket", &self.publish.bucket)?;
        validation::validate_aws_region("publish.region", &self.publish.region)?;
        if self.publish.include.is_empty() {
            return Err(SiteError::InvalidConfigValueError {
                field: "publish.include".to_string(),
                value: "[]".to_string(),
                reason: "at least one include pattern is required".to_string(),
            });
        }
        for pattern in &self.publish.include {
            validation::validate_glob_pattern("publish.include", pattern)?;
        }
        validation::validate_range("publish.max_retries", self.publish.max_retries, 0, 10)?;
        validation::validate_range("publish.timeout_seconds", self.publish.timeout_seconds, 1, 300)?;

        tracing::debug!("✅ Site configuration validation passed");
        Ok(())
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Content source unavailable (worksheet {worksheet}): {message}")]
    ContentSourceUnavailable { worksheet: usize, message: String },

    #[error("Content source returned no data (worksheet {worksheet}): {what} is empty")]
    ContentSourceEmpty { worksheet: usize, what: String },

    #[error(
        "Malformed content in worksheet {worksheet}: expected {expected} band markers, found {actual}"
    )]
    MalformedContent {
        worksheet: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Template render failed for {template}: {message}")]
    TemplateRender { template: String, message: String },

    #[error("Publish failed for {} object(s) [{}]: {message}", failed_keys.len(), failed_keys.join(", "))]
    Publish {
        failed_keys: Vec<String>,
        message: String,
    },

    #[error("Image processing failed for {path}: {message}")]
    Image { path: String, message: String },

    #[error("Style compilation failed for {file}: {message}")]
    StyleCompile { file: String, message: String },

    #[error("File error at {path}: {source}")]
    FileError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SiteError>;

/// 錯誤分類，對應建置流程中的階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    ContentSource,
    Content,
    Template,
    Publish,
    Asset,
}

impl SiteError {
    pub fn file(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        SiteError::FileError {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SiteError::ConfigError { .. }
            | SiteError::MissingConfigError { .. }
            | SiteError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            SiteError::ContentSourceUnavailable { .. } | SiteError::ContentSourceEmpty { .. } => {
                ErrorCategory::ContentSource
            }
            SiteError::MalformedContent { .. } => ErrorCategory::Content,
            SiteError::TemplateRender { .. } => ErrorCategory::Template,
            SiteError::Publish { .. } => ErrorCategory::Publish,
            SiteError::Image { .. }
            | SiteError::StyleCompile { .. }
            | SiteError::FileError { .. } => ErrorCategory::Asset,
        }
    }

    /// Process exit code for the CLI. Each error kind gets its own code.
    pub fn exit_code(&self) -> i32 {
        match self {
            SiteError::ConfigError { .. }
            | SiteError::MissingConfigError { .. }
            | SiteError::InvalidConfigValueError { .. } => 2,
            SiteError::ContentSourceUnavailable { .. } => 3,
            SiteError::ContentSourceEmpty { .. } => 4,
            SiteError::MalformedContent { .. } => 5,
            SiteError::TemplateRender { .. } => 6,
            SiteError::Publish { .. } => 7,
            SiteError::Image { .. }
            | SiteError::StyleCompile { .. }
            | SiteError::FileError { .. } => 8,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SiteError::ConfigError { .. } | SiteError::InvalidConfigValueError { .. } => {
                "Check site.toml and the command line flags"
            }
            SiteError::MissingConfigError { .. } => {
                "Export access_key/private_key and sheets_creds (or sheets_creds_b64)"
            }
            SiteError::ContentSourceUnavailable { .. } => {
                "Check network access and that the service account can read the spreadsheet"
            }
            SiteError::ContentSourceEmpty { .. } => "Fill in the worksheet and run the build again",
            SiteError::MalformedContent { .. } => {
                "The photos worksheet needs exactly three rows whose first cell starts with '--'"
            }
            SiteError::TemplateRender { .. } => {
                "Check the template file for syntax errors and unknown variables"
            }
            SiteError::Publish { .. } => {
                "Check bucket permissions; the freshness marker was not advanced so a rerun retries the same files"
            }
            SiteError::Image { .. } => "Check the gallery image is a readable JPEG",
            SiteError::StyleCompile { .. } => "Fix the SCSS source or run with --no-styles",
            SiteError::FileError { .. } => "Check the file exists and is readable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::ContentSource => format!("Could not read site content: {}", self),
            ErrorCategory::Content => format!("Site content is malformed: {}", self),
            ErrorCategory::Template => format!("Could not render the page: {}", self),
            ErrorCategory::Publish => format!("Deploy failed: {}", self),
            ErrorCategory::Asset => format!("Asset processing failed: {}", self),
        }
    }
}

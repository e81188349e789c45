use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::env;

pub const DEFAULT_REPO_URL: &str = "https://github.com/michaelmu/lindabaird.git";

/// Serverless settings, read from the function's environment.
#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub repo_url: String,
    pub repo_branch: Option<String>,
    /// Configuration file inside the cloned repository.
    pub site_config: Option<String>,
    pub spreadsheet_id: Option<String>,
}

impl LambdaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            repo_url: non_empty("REPO_URL").unwrap_or_else(|| DEFAULT_REPO_URL.to_string()),
            repo_branch: non_empty("REPO_BRANCH"),
            site_config: non_empty("SITE_CONFIG"),
            spreadsheet_id: non_empty("SPREADSHEET_ID"),
        }
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("REPO_URL", &self.repo_url)?;
        if let Some(branch) = &self.repo_branch {
            validation::validate_non_empty_string("REPO_BRANCH", branch)?;
        }
        if let Some(path) = &self.site_config {
            validation::validate_relative_path("SITE_CONFIG", path)?;
        }
        tracing::info!("✅ Lambda configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_site_repository() {
        let config = LambdaConfig::from_lookup(|_| None);
        assert_eq!(config.repo_url, DEFAULT_REPO_URL);
        assert!(config.repo_branch.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_and_validation() {
        let config = LambdaConfig::from_lookup(|name| match name {
            "REPO_URL" => Some("git@github.com:someone/site.git".to_string()),
            "SITE_CONFIG" => Some("deploy/site.toml".to_string()),
            _ => None,
        });
        assert_eq!(config.site_config.as_deref(), Some("deploy/site.toml"));
        // 只支援 https clone
        assert!(config.validate().is_err());
    }
}

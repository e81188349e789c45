pub mod credentials;
pub mod lambda;
pub mod site;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

#[cfg(feature = "cli")]
mod cli {
    use crate::config::site::SiteConfig;
    use crate::core::freshness::FreshnessPolicy;
    use crate::utils::error::{Result, SiteError};
    use crate::utils::validation::Validate;
    use clap::Parser;
    use std::path::PathBuf;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "site-sync")]
    #[command(about = "Build the static site from its spreadsheet content and deploy it to S3")]
    pub struct CliConfig {
        /// Deploy the site to S3 after building
        #[arg(long)]
        pub deploy: bool,

        /// Site root (template, assets, marker file)
        #[arg(long, default_value = ".")]
        pub root: PathBuf,

        /// Site configuration file (defaults to <root>/site.toml when present)
        #[arg(short, long)]
        pub config: Option<PathBuf>,

        /// Skip SCSS compilation
        #[arg(long)]
        pub no_styles: bool,

        /// Override the freshness policy
        #[arg(long, value_enum)]
        pub freshness: Option<FreshnessPolicy>,

        /// Spreadsheet to read content from
        #[arg(long, env = "SPREADSHEET_ID")]
        pub spreadsheet_id: Option<String>,

        /// Publish into this directory instead of the S3 bucket
        #[arg(long)]
        pub output_dir: Option<PathBuf>,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log CPU and memory usage per stage")]
        pub monitor: bool,
    }

    impl CliConfig {
        /// 命令列參數覆蓋設定檔
        pub fn apply(&self, config: &mut SiteConfig) {
            if self.no_styles {
                config.styles.enabled = false;
            }
            if let Some(policy) = self.freshness {
                config.freshness.policy = Some(policy);
            }
            if let Some(id) = &self.spreadsheet_id {
                config.content.spreadsheet_id = id.clone();
            }
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            if !self.root.is_dir() {
                return Err(SiteError::InvalidConfigValueError {
                    field: "root".to_string(),
                    value: self.root.display().to_string(),
                    reason: "site root must be an existing directory".to_string(),
                });
            }
            if let Some(config) = &self.config {
                if !config.is_file() {
                    return Err(SiteError::InvalidConfigValueError {
                        field: "config".to_string(),
                        value: config.display().to_string(),
                        reason: "configuration file not found".to_string(),
                    });
                }
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_deploy_defaults_off() {
            let cli = CliConfig::parse_from(["site-sync"]);
            assert!(!cli.deploy);
            assert_eq!(cli.root, PathBuf::from("."));

            let cli = CliConfig::parse_from(["site-sync", "--deploy"]);
            assert!(cli.deploy);
        }

        #[test]
        fn test_flags_override_site_config() {
            let cli = CliConfig::parse_from([
                "site-sync",
                "--no-styles",
                "--freshness",
                "always",
                "--spreadsheet-id",
                "xyz",
            ]);
            let mut config = SiteConfig::default();
            cli.apply(&mut config);
            assert!(!config.styles.enabled);
            assert_eq!(config.freshness.policy, Some(FreshnessPolicy::Always));
            assert_eq!(config.content.spreadsheet_id, "xyz");
        }

        #[test]
        fn test_missing_root_fails_validation() {
            let cli = CliConfig::parse_from(["site-sync", "--root", "/no/such/site/root"]);
            assert!(cli.validate().is_err());
        }
    }
}

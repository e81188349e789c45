//! Build of a freshly cloned site repository, as run by the serverless entry.

use crate::adapters::{self, marker::FileMarkerStore, repo};
use crate::config::credentials::Credentials;
use crate::config::lambda::LambdaConfig;
use crate::config::site::SiteConfig;
use crate::core::build::BuildEngine;
use crate::core::freshness::{FreshnessPolicy, FreshnessTracker};
use crate::domain::model::BuildReport;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::path::{Path, PathBuf};

/// Reads the credentials, then clones the site repository under `parent`.
///
/// Missing storage keys fail before anything is fetched. The sheets key is
/// only checked once the checkout's content source is known.
pub async fn fetch_checkout<F>(
    lambda_config: &LambdaConfig,
    lookup: F,
    parent: &Path,
) -> Result<(Credentials, PathBuf)>
where
    F: Fn(&str) -> Option<String>,
{
    let credentials = Credentials::from_lookup(lookup, false)?;
    let checkout = repo::clone_repository(
        &lambda_config.repo_url,
        lambda_config.repo_branch.as_deref(),
        parent,
    )
    .await?;
    Ok((credentials, checkout))
}

/// Site configuration of a checkout with the serverless overrides applied.
pub fn checkout_config(checkout: &Path, lambda_config: &LambdaConfig) -> Result<SiteConfig> {
    let explicit = lambda_config.site_config.as_ref().map(|p| checkout.join(p));
    let mut config = SiteConfig::load(checkout, explicit.as_deref())?;
    if let Some(id) = &lambda_config.spreadsheet_id {
        config.content.spreadsheet_id = id.clone();
    }
    // 執行環境沒有持久的 marker，也不編譯 SCSS
    config.freshness.policy = Some(FreshnessPolicy::Always);
    config.styles.enabled = false;
    config.validate()?;
    Ok(config)
}

/// Builds `checkout` and, when `deploy` is set, publishes it to `storage`.
pub async fn build_checkout<S: Storage>(
    checkout: &Path,
    config: SiteConfig,
    credentials: &Credentials,
    storage: S,
    deploy: bool,
) -> Result<BuildReport> {
    let content = adapters::content_source(checkout, &config, credentials)?;
    let marker = FileMarkerStore::new(checkout.join(&config.freshness.marker_file));
    let tracker = FreshnessTracker::load(
        Box::new(marker),
        config.freshness_policy(FreshnessPolicy::Always),
    );

    BuildEngine::new(checkout, config, storage, content, tracker)
        .run(deploy)
        .await
}

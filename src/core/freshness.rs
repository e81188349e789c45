//! Incremental-sync decisions.
//!
//! A build reads the marker once, asks [`FreshnessTracker::is_stale`] for every
//! candidate file, and advances the marker only after a successful publish.

use crate::domain::model::{format_marker, sentinel_marker, MarkerReadError};
use crate::domain::ports::MarkerStore;
use crate::utils::error::{Result, SiteError};
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// When a file counts as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum FreshnessPolicy {
    /// Every file is stale. For hosts without durable state between runs.
    Always,
    /// Stale iff modified after the marker.
    Incremental,
}

impl std::fmt::Display for FreshnessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FreshnessPolicy::Always => write!(f, "always"),
            FreshnessPolicy::Incremental => write!(f, "incremental"),
        }
    }
}

pub struct FreshnessTracker {
    store: Box<dyn MarkerStore>,
    policy: FreshnessPolicy,
    marker: NaiveDateTime,
}

impl FreshnessTracker {
    /// Reads the marker from `store` once; later calls use the cached value.
    pub fn load(store: Box<dyn MarkerStore>, policy: FreshnessPolicy) -> Self {
        let marker = read_marker(store.as_ref());
        tracing::debug!(
            "🕒 Freshness marker {} (policy: {})",
            format_marker(&marker),
            policy
        );
        Self {
            store,
            policy,
            marker,
        }
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    pub fn get_marker(&self) -> NaiveDateTime {
        self.marker
    }

    /// Persists `now` (whole seconds, UTC) as the new marker.
    ///
    /// The marker never moves backwards: if `now` is earlier than the current
    /// marker the current value is written again.
    pub fn set_marker(&mut self, now: NaiveDateTime) -> Result<()> {
        let next = truncate_to_seconds(now).max(self.marker);
        self.store.set(next)?;
        self.marker = next;
        tracing::info!("🕒 Freshness marker advanced to {}", format_marker(&next));
        Ok(())
    }

    pub fn is_stale(&self, path: &Path) -> Result<bool> {
        match self.policy {
            FreshnessPolicy::Always => Ok(true),
            FreshnessPolicy::Incremental => {
                let modified = modified_utc(path)?;
                Ok(modified > self.marker)
            }
        }
    }
}

fn read_marker(store: &dyn MarkerStore) -> NaiveDateTime {
    match store.get() {
        Ok(ts) => ts,
        Err(MarkerReadError::Missing) => {
            tracing::debug!("No freshness marker yet, treating every file as stale");
            sentinel_marker()
        }
        Err(e) => {
            tracing::warn!("⚠️ Ignoring freshness marker: {}", e);
            sentinel_marker()
        }
    }
}

fn truncate_to_seconds(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// 檔案修改時間（UTC），截到秒以符合 marker 的精度
pub fn modified_utc(path: &Path) -> Result<NaiveDateTime> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| SiteError::file(path, e))?;
    let utc: DateTime<Utc> = modified.into();
    Ok(truncate_to_seconds(utc.naive_utc()))
}

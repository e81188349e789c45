pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

#[cfg(feature = "s3")]
pub use crate::adapters::storage::S3Storage;

pub use crate::adapters::storage::LocalStorage;
pub use crate::config::{credentials::Credentials, site::SiteConfig};
pub use crate::core::build::BuildEngine;
pub use crate::core::freshness::{FreshnessPolicy, FreshnessTracker};
pub use crate::utils::error::{Result, SiteError};

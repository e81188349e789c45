pub mod build;
pub mod content;
pub mod freshness;
pub mod gallery;
pub mod publish;
pub mod render;
pub mod serverless;
pub mod styles;

pub use crate::domain::model::{BuildReport, ContentSections, PublishReport, Row};
pub use crate::domain::ports::{ContentSource, MarkerStore, Storage};
pub use crate::utils::error::Result;

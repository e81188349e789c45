use crate::core::freshness::FreshnessTracker;
use crate::utils::error::{Result, SiteError};
use image::ImageFormat;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct PlaceholderOptions {
    /// Gallery glob relative to the site root.
    pub pattern: String,
    /// File-name prefix marking a generated placeholder.
    pub prefix: String,
    pub width: u32,
    pub height: u32,
}

/// 產生模糊預覽用的縮圖：`photo.jpg` -> `__photo.jpg`
pub struct PlaceholderGenerator<'a> {
    root: &'a Path,
    options: &'a PlaceholderOptions,
}

impl<'a> PlaceholderGenerator<'a> {
    pub fn new(root: &'a Path, options: &'a PlaceholderOptions) -> Self {
        Self { root, options }
    }

    fn is_placeholder(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(&self.options.prefix))
    }

    pub fn placeholder_path(&self, image: &Path) -> Option<PathBuf> {
        let name = image.file_name()?.to_str()?;
        Some(image.with_file_name(format!("{}{}", self.options.prefix, name)))
    }

    /// Regenerates placeholders for stale gallery images; returns how many were written.
    pub fn generate(&self, tracker: &FreshnessTracker) -> Result<usize> {
        let images = crate::core::publish::expand_patterns(
            self.root,
            std::slice::from_ref(&self.options.pattern),
        )?;

        let mut written = 0;
        for image in images {
            if self.is_placeholder(&image) {
                continue;
            }
            if !tracker.is_stale(&image)? {
                continue;
            }
            self.render_placeholder(&image)?;
            written += 1;
        }

        tracing::info!("🖼️ Generated {} gallery placeholders", written);
        Ok(written)
    }

    pub fn render_placeholder(&self, image: &Path) -> Result<PathBuf> {
        let target = self
            .placeholder_path(image)
            .ok_or_else(|| SiteError::Image {
                path: image.display().to_string(),
                message: "image path has no UTF-8 file name".to_string(),
            })?;

        let img = image::open(image).map_err(|e| SiteError::Image {
            path: image.display().to_string(),
            message: e.to_string(),
        })?;

        // JPEG 不支援 alpha，先轉成 RGB
        let thumb = img.thumbnail(self.options.width, self.options.height).to_rgb8();
        thumb
            .save_with_format(&target, ImageFormat::Jpeg)
            .map_err(|e| SiteError::Image {
                path: target.display().to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!("{} -> {}", image.display(), target.display());
        Ok(target)
    }
}

use crate::core::freshness::FreshnessTracker;
use crate::utils::error::{Result, SiteError};
use chrono::Utc;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub enabled: bool,
    /// SCSS directory relative to the site root.
    pub input_dir: String,
    /// Stylesheet directory relative to the site root.
    pub output_dir: String,
    /// Entry files inside `input_dir`.
    pub sources: Vec<String>,
}

/// Compiles SCSS entry points with grass.
pub struct StyleCompiler<'a> {
    root: &'a Path,
    options: &'a StyleOptions,
}

impl<'a> StyleCompiler<'a> {
    pub fn new(root: &'a Path, options: &'a StyleOptions) -> Self {
        Self { root, options }
    }

    pub fn output_path(&self, source: &str) -> PathBuf {
        let stem = Path::new(source)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.to_string());
        self.root
            .join(&self.options.output_dir)
            .join(format!("{}.css", stem))
    }

    /// Compiles every stale source; returns the number of stylesheets written.
    pub fn compile_all(&self, tracker: &FreshnessTracker) -> Result<usize> {
        let mut compiled = 0;
        for source in &self.options.sources {
            let input = self.root.join(&self.options.input_dir).join(source);
            if !tracker.is_stale(&input)? {
                tracing::debug!("Stylesheet source unchanged: {}", input.display());
                continue;
            }
            let output = self.output_path(source);
            self.compile(&input, &output)?;
            compiled += 1;
        }
        tracing::info!("🎨 Compiled {} stylesheets", compiled);
        Ok(compiled)
    }

    pub fn compile(&self, input: &Path, output: &Path) -> Result<()> {
        let css = grass::from_path(input, &grass::Options::default()).map_err(|e| {
            SiteError::StyleCompile {
                file: input.display().to_string(),
                message: e.to_string(),
            }
        })?;

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SiteError::file(parent, e))?;
        }
        let stamped = format!(
            "/* Compiled on {} */\n{}",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            css
        );
        std::fs::write(output, stamped).map_err(|e| SiteError::file(output, e))?;

        tracing::debug!("{} -> {}", input.display(), output.display());
        Ok(())
    }
}

use crate::config::site::SiteConfig;
use crate::core::content::ContentAggregator;
use crate::core::freshness::FreshnessTracker;
use crate::core::gallery::PlaceholderGenerator;
use crate::core::publish::AssetPublisher;
use crate::core::render::TemplateRenderer;
use crate::core::styles::StyleCompiler;
use crate::domain::model::BuildReport;
use crate::domain::ports::{ContentSource, Storage};
use crate::utils::error::Result;
use crate::utils::monitor::BuildMonitor;
use chrono::Utc;
use std::path::PathBuf;
use std::time::Instant;

/// Runs the build stages in order and stops at the first failure.
///
/// 1. gallery placeholders
/// 2. stylesheets (when enabled)
/// 3. page render
/// 4. publish (when deploying)
pub struct BuildEngine<S: Storage> {
    root: PathBuf,
    config: SiteConfig,
    storage: S,
    content: Box<dyn ContentSource>,
    tracker: FreshnessTracker,
    monitor: BuildMonitor,
}

impl<S: Storage> BuildEngine<S> {
    pub fn new(
        root: impl Into<PathBuf>,
        config: SiteConfig,
        storage: S,
        content: Box<dyn ContentSource>,
        tracker: FreshnessTracker,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            storage,
            content,
            tracker,
            monitor: BuildMonitor::disabled(),
        }
    }

    pub fn with_monitor(mut self, monitor: BuildMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn tracker(&self) -> &FreshnessTracker {
        &self.tracker
    }

    pub async fn run(&mut self, deploy: bool) -> Result<BuildReport> {
        tracing::info!(
            "🚀 Building site at {} (freshness: {}, deploy: {})",
            self.root.display(),
            self.tracker.policy(),
            deploy
        );

        // 1. 縮圖
        let started = Instant::now();
        let gallery = self.config.placeholder_options();
        let placeholders_generated =
            PlaceholderGenerator::new(&self.root, &gallery).generate(&self.tracker)?;
        self.monitor.stage_finished("Gallery placeholders", started.elapsed());

        // 2. CSS（Lambda 上沒有編譯環境時會關閉）
        let started = Instant::now();
        let styles = self.config.style_options();
        let stylesheets_compiled = if styles.enabled {
            tracing::info!("🎨 Compiling CSS...");
            StyleCompiler::new(&self.root, &styles).compile_all(&self.tracker)?
        } else {
            tracing::info!("🎨 Style compilation disabled");
            0
        };
        self.monitor.stage_finished("Stylesheets", started.elapsed());

        // 3. 產生頁面
        let started = Instant::now();
        let zone = self.config.display_zone()?;
        let content = ContentAggregator::new(self.content.as_ref())
            .collect()
            .await?;
        let sections = zone.sections(content, Utc::now());
        let renderer = TemplateRenderer::new(
            self.root.join(&self.config.site.template),
            self.root.join(&self.config.site.output),
        );
        let page_changed = renderer.render_to_file(&sections)?;
        self.monitor.stage_finished("Render", started.elapsed());

        // 4. 部署
        let publish = if deploy {
            let started = Instant::now();
            let options = self.config.publish_options();
            let report = AssetPublisher::new(&self.root, &self.storage, &options)
                .publish(&mut self.tracker)
                .await?;
            self.monitor.stage_finished("Publish", started.elapsed());
            Some(report)
        } else {
            tracing::info!("⏸️ Not deploying");
            None
        };

        let report = BuildReport {
            placeholders_generated,
            stylesheets_compiled,
            page: renderer.output().to_path_buf(),
            page_changed,
            publish,
        };

        tracing::info!(
            "✅ Build complete: {} placeholders, {} stylesheets, page {}, {} files uploaded",
            report.placeholders_generated,
            report.stylesheets_compiled,
            if report.page_changed { "updated" } else { "unchanged" },
            report.files_uploaded()
        );
        self.monitor.log_final();
        Ok(report)
    }
}

use clap::Parser;
use site_sync::adapters::{self, marker::FileMarkerStore};
use site_sync::config::site::ContentSourceKind;
use site_sync::domain::model::BuildReport;
use site_sync::utils::{logger, monitor::BuildMonitor, validation::Validate};
use site_sync::{
    BuildEngine, CliConfig, Credentials, FreshnessPolicy, FreshnessTracker, LocalStorage,
    S3Storage, SiteConfig, SiteError,
};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting site-sync CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match run(&cli).await {
        Ok(report) => {
            println!("✅ Site built: {}", report.page.display());
            match &report.publish {
                Some(publish) => {
                    println!("☁️ {}", publish.summary());
                    for skipped in &publish.skipped {
                        println!("⚠️ Skipped {} ({})", skipped.path.display(), skipped.reason);
                    }
                }
                None => println!("⏸️ Not deploying"),
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Build failed: {} (Category: {:?})",
                e,
                e.category()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: &CliConfig) -> Result<BuildReport, SiteError> {
    cli.validate()?;
    let root = cli
        .root
        .canonicalize()
        .map_err(|e| SiteError::file(&cli.root, e))?;

    let mut config = SiteConfig::load(&root, cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    // 憑證缺少時在任何階段開始前就失敗
    let credentials = Credentials::from_env(config.content.source == ContentSourceKind::Sheets)?;
    let content = adapters::content_source(&root, &config, &credentials)?;

    // 本機有持久的 marker 檔，預設使用增量模式
    let policy = config.freshness_policy(FreshnessPolicy::Incremental);
    let marker = FileMarkerStore::new(root.join(&config.freshness.marker_file));
    let tracker = FreshnessTracker::load(Box::new(marker), policy);

    let monitor = BuildMonitor::new(cli.monitor);
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    if let Some(dir) = &cli.output_dir {
        let storage = LocalStorage::new(dir);
        BuildEngine::new(root, config, storage, content, tracker)
            .with_monitor(monitor)
            .run(cli.deploy)
            .await
    } else {
        let storage = S3Storage::connect(
            &credentials.storage,
            &config.publish.region,
            &config.publish.bucket,
            Duration::from_secs(config.publish.timeout_seconds),
        )
        .await;
        BuildEngine::new(root, config, storage, content, tracker)
            .with_monitor(monitor)
            .run(cli.deploy)
            .await
    }
}

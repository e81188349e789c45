use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output shape of the log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One compact line per event, for terminals.
    Compact,
    /// One JSON object per event, for CloudWatch.
    Json,
}

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "site_sync=debug,lambda=debug,info"
    } else {
        "site_sync=info,lambda=info,warn"
    }
}

/// 初始化 tracing，`RUST_LOG` 優先於預設過濾條件
pub fn init_logger(format: LogFormat, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(layer.compact())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.without_time().json())
            .init(),
    }
}

pub fn init_cli_logger(verbose: bool) {
    init_logger(LogFormat::Compact, verbose);
}

pub fn init_lambda_logger() {
    init_logger(LogFormat::Json, false);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_enables_debug_for_crate() {
        assert!(default_directives(true).contains("site_sync=debug"));
        assert!(default_directives(false).contains("site_sync=info"));
    }
}

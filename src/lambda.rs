use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::Serialize;
use serde_json::Value;
use site_sync::config::lambda::LambdaConfig;
use site_sync::core::serverless;
use site_sync::utils::{logger, validation::Validate};
use site_sync::S3Storage;
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct Response {
    pub message: String,
    pub files_uploaded: usize,
}

/// 事件中只要出現 `testmode` 鍵（不論值）就只建置不部署
fn is_test_mode(payload: &Value) -> bool {
    payload
        .as_object()
        .is_some_and(|fields| fields.contains_key("testmode"))
}

async fn function_handler(event: LambdaEvent<Value>) -> Result<Response, Error> {
    let deploy = !is_test_mode(&event.payload);
    tracing::info!("🚀 Site build invoked (deploy: {})", deploy);

    let lambda_config = LambdaConfig::from_env();
    lambda_config.validate()?;

    // 每次呼叫都使用新的暫存目錄，結束時自動清除
    let workspace = tempfile::TempDir::new()?;
    let (credentials, checkout) = serverless::fetch_checkout(
        &lambda_config,
        |name| std::env::var(name).ok(),
        workspace.path(),
    )
    .await?;

    let config = serverless::checkout_config(&checkout, &lambda_config)?;
    let storage = S3Storage::connect(
        &credentials.storage,
        &config.publish.region,
        &config.publish.bucket,
        Duration::from_secs(config.publish.timeout_seconds),
    )
    .await;
    let report =
        serverless::build_checkout(&checkout, config, &credentials, storage, deploy).await?;

    let response = Response {
        message: match &report.publish {
            Some(publish) => format!("Site deployed: {}", publish.summary()),
            None => "Site built, not deploying".to_string(),
        },
        files_uploaded: report.files_uploaded(),
    };

    tracing::info!("✅ {}", response.message);
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();
    run(service_fn(function_handler)).await
}

use crate::domain::ports::Storage;
use crate::utils::error::{Result, SiteError};
use std::path::{Path, PathBuf};

/// Mirrors uploads into a local directory, keeping keys as relative paths.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn object_path(&self, key: &str) -> PathBuf {
        key.split('/')
            .fold(self.base_path.clone(), |path, part| path.join(part))
    }
}

impl Storage for LocalStorage {
    async fn upload_file(&self, key: &str, path: &Path, _content_type: &str) -> Result<()> {
        let failed = |message: String| SiteError::Publish {
            failed_keys: vec![key.to_string()],
            message,
        };

        let target = self.object_path(key);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| failed(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::copy(path, &target)
            .await
            .map_err(|e| failed(e.to_string()))?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("directory {}", self.base_path.display())
    }
}

#[cfg(feature = "s3")]
pub use s3::S3Storage;

#[cfg(feature = "s3")]
mod s3 {
    use crate::config::credentials::StorageCredentials;
    use crate::domain::ports::Storage;
    use crate::utils::error::{Result, SiteError};
    use aws_config::retry::RetryConfig;
    use aws_config::timeout::TimeoutConfig;
    use aws_config::BehaviorVersion;
    use aws_sdk_s3::config::{Credentials, Region};
    use aws_sdk_s3::error::DisplayErrorContext;
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::Client as S3Client;
    use std::path::Path;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    pub struct S3Storage {
        client: S3Client,
        bucket: String,
    }

    impl S3Storage {
        pub fn new(client: S3Client, bucket: String) -> Self {
            Self { client, bucket }
        }

        /// Client with explicit keys, an operation timeout and SDK retries off
        /// (the publisher owns the retry policy).
        pub async fn connect(
            credentials: &StorageCredentials,
            region: &str,
            bucket: &str,
            timeout: Duration,
        ) -> Self {
            let provider = Credentials::new(
                credentials.access_key.clone(),
                credentials.secret_key.clone(),
                None,
                None,
                "site-sync",
            );
            let config = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(region.to_string()))
                .credentials_provider(provider)
                .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build())
                .retry_config(RetryConfig::disabled())
                .load()
                .await;

            Self::new(S3Client::new(&config), bucket.to_string())
        }
    }

    impl Storage for S3Storage {
        async fn upload_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()> {
            let body = ByteStream::from_path(path)
                .await
                .map_err(|e| SiteError::Publish {
                    failed_keys: vec![key.to_string()],
                    message: format!("cannot read {}: {}", path.display(), e),
                })?;

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .content_type(content_type)
                .body(body)
                .send()
                .await
                .map_err(|e| SiteError::Publish {
                    failed_keys: vec![key.to_string()],
                    message: format!("{}", DisplayErrorContext(&e)),
                })?;

            Ok(())
        }

        fn describe(&self) -> String {
            format!("s3://{}", self.bucket)
        }
    }
}

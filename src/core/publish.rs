use crate::core::freshness::FreshnessTracker;
use crate::domain::model::{PublishReport, SkippedAsset};
use crate::domain::ports::Storage;
use crate::utils::error::{Result, SiteError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Font extensions the generic MIME table does not map to `font/*`.
const FONT_CONTENT_TYPES: &[(&str, &str)] = &[
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
];

/// What to do when a single upload fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failed object.
    #[default]
    Abort,
    /// Upload everything else, then fail with every failed key.
    Continue,
}

#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub include: Vec<String>,
    pub prefix: String,
    pub on_failure: FailurePolicy,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

/// Content type for an upload, or `None` when nothing matches.
pub fn resolve_content_type(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();

    if let Some((_, content_type)) = FONT_CONTENT_TYPES.iter().find(|(e, _)| *e == ext) {
        return Some(content_type.to_string());
    }

    mime_guess::from_ext(&ext)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Expands include patterns relative to `root`.
///
/// Only regular files are returned, in pattern order, each at most once.
pub fn expand_patterns(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let root_str = root.to_str().ok_or_else(|| SiteError::ConfigError {
        message: format!("site root is not valid UTF-8: {}", root.display()),
    })?;
    let escaped_root = glob::Pattern::escape(root_str.trim_end_matches('/'));

    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        let full = format!("{}/{}", escaped_root, pattern);
        let entries = glob::glob(&full).map_err(|e| SiteError::InvalidConfigValueError {
            field: "publish.include".to_string(),
            value: pattern.clone(),
            reason: format!("Invalid glob pattern: {}", e),
        })?;

        let mut matched = 0;
        for entry in entries {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                SiteError::file(path, e.into())
            })?;
            if !path.is_file() {
                continue;
            }
            matched += 1;
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }

        if matched == 0 {
            tracing::debug!("No files matched pattern: {}", pattern);
        }
    }

    Ok(files)
}

/// Object key for `path`: relative to `root`, `/`-separated, optionally prefixed.
pub fn destination_key(root: &Path, path: &Path, prefix: &str) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| SiteError::ConfigError {
        message: format!(
            "{} is outside the site root {}",
            path.display(),
            root.display()
        ),
    })?;

    let key = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        Ok(key)
    } else {
        Ok(format!("{}/{}", prefix, key))
    }
}

/// 上傳有變動的檔案，全部成功後才推進 freshness marker
pub struct AssetPublisher<'a, S: Storage> {
    root: &'a Path,
    storage: &'a S,
    options: &'a PublishOptions,
}

impl<'a, S: Storage> AssetPublisher<'a, S> {
    pub fn new(root: &'a Path, storage: &'a S, options: &'a PublishOptions) -> Self {
        Self {
            root,
            storage,
            options,
        }
    }

    pub async fn publish(&self, tracker: &mut FreshnessTracker) -> Result<PublishReport> {
        tracing::info!("☁️ Syncing files to {}", self.storage.describe());

        let files = expand_patterns(self.root, &self.options.include)?;
        let mut report = PublishReport::default();
        let mut failures: Vec<(String, SiteError)> = Vec::new();

        for path in files {
            if !tracker.is_stale(&path)? {
                report.unchanged += 1;
                continue;
            }

            let Some(content_type) = resolve_content_type(&path) else {
                tracing::warn!(
                    "⚠️ Not handling type of this file, skipping: {}",
                    path.display()
                );
                report.skipped.push(SkippedAsset {
                    path,
                    reason: "unrecognized content type".to_string(),
                });
                continue;
            };

            let key = destination_key(self.root, &path, &self.options.prefix)?;
            tracing::info!("{} -> {} ({})", path.display(), key, content_type);

            match self.upload_with_retry(&key, &path, &content_type).await {
                Ok(()) => report.uploaded.push(key),
                Err(e) => match self.options.on_failure {
                    FailurePolicy::Abort => {
                        return Err(SiteError::Publish {
                            failed_keys: vec![key],
                            message: e.to_string(),
                        });
                    }
                    FailurePolicy::Continue => {
                        tracing::error!("❌ Upload failed for {}: {}", key, e);
                        failures.push((key, e));
                    }
                },
            }
        }

        if !failures.is_empty() {
            let message = failures
                .first()
                .map(|(_, e)| e.to_string())
                .unwrap_or_default();
            return Err(SiteError::Publish {
                failed_keys: failures.into_iter().map(|(key, _)| key).collect(),
                message,
            });
        }

        tracker.set_marker(Utc::now().naive_utc())?;

        if !report.skipped.is_empty() {
            tracing::warn!("⚠️ {} files skipped", report.skipped.len());
        }
        tracing::info!("✅ {}", report.summary());
        Ok(report)
    }

    async fn upload_with_retry(&self, key: &str, path: &Path, content_type: &str) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.storage.upload_file(key, path, content_type).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.options.max_retries => {
                    attempt += 1;
                    let delay = self.options.retry_delay * attempt;
                    tracing::warn!(
                        "🔁 Upload of {} failed ({}), retry {}/{} in {:?}",
                        key,
                        e,
                        attempt,
                        self.options.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::marker::MemoryMarkerStore;
    use crate::core::freshness::FreshnessPolicy;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        uploads: Arc<Mutex<Vec<(String, String)>>>,
        // key -> 剩餘失敗次數
        failures: Arc<Mutex<HashMap<String, u32>>>,
    }

    impl MockStorage {
        fn failing(key: &str, times: u32) -> Self {
            let storage = Self::default();
            storage
                .failures
                .try_lock()
                .unwrap()
                .insert(key.to_string(), times);
            storage
        }

        async fn keys(&self) -> Vec<String> {
            self.uploads.lock().await.iter().map(|(k, _)| k.clone()).collect()
        }
    }

    impl Storage for MockStorage {
        async fn upload_file(&self, key: &str, _path: &Path, content_type: &str) -> Result<()> {
            let mut failures = self.failures.lock().await;
            if let Some(remaining) = failures.get_mut(key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SiteError::ConfigError {
                        message: format!("simulated failure for {}", key),
                    });
                }
            }
            self.uploads
                .lock()
                .await
                .push((key.to_string(), content_type.to_string()));
            Ok(())
        }

        fn describe(&self) -> String {
            "mock storage".to_string()
        }
    }

    fn site(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for f in files {
            let path = dir.path().join(f);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, f.as_bytes()).unwrap();
        }
        dir
    }

    fn options(include: &[&str]) -> PublishOptions {
        PublishOptions {
            include: include.iter().map(|s| s.to_string()).collect(),
            prefix: String::new(),
            on_failure: FailurePolicy::Abort,
            max_retries: 0,
            retry_delay: Duration::from_millis(1),
        }
    }

    fn tracker(store: &MemoryMarkerStore) -> FreshnessTracker {
        FreshnessTracker::load(Box::new(store.clone()), FreshnessPolicy::Always)
    }

    #[test]
    fn test_font_overrides() {
        for ext in ["woff", "woff2", "ttf"] {
            let path = PathBuf::from(format!("include/fonts/icomoon/icons.{}", ext));
            assert_eq!(resolve_content_type(&path), Some(format!("font/{}", ext)));
        }
        assert_eq!(
            resolve_content_type(Path::new("FONT.WOFF2")),
            Some("font/woff2".to_string())
        );
    }

    #[test]
    fn test_common_content_types() {
        assert_eq!(
            resolve_content_type(Path::new("index.html")).as_deref(),
            Some("text/html")
        );
        assert_eq!(
            resolve_content_type(Path::new("include/css/style.css")).as_deref(),
            Some("text/css")
        );
        assert_eq!(
            resolve_content_type(Path::new("include/images/a.jpg")).as_deref(),
            Some("image/jpeg")
        );
        assert_eq!(resolve_content_type(Path::new("data.zzqx")), None);
        assert_eq!(resolve_content_type(Path::new("LICENSE")), None);
    }

    #[test]
    fn test_destination_key_is_relative_with_slashes() {
        let root = Path::new("/site");
        let path = Path::new("/site/include/css/style.css");
        assert_eq!(destination_key(root, path, "").unwrap(), "include/css/style.css");
        assert_eq!(
            destination_key(root, path, "/preview/").unwrap(),
            "preview/include/css/style.css"
        );
        assert!(destination_key(root, Path::new("/elsewhere/a.css"), "").is_err());
    }

    #[test]
    fn test_expand_patterns_dedups_and_skips_directories() {
        let dir = site(&["index.html", "include/css/a.css", "include/css/b.css"]);
        std::fs::create_dir_all(dir.path().join("include/css/sub.css")).unwrap();

        let files = expand_patterns(
            dir.path(),
            &["include/css/*.css".to_string(), "include/css/a.css".to_string(), "index.html".to_string()],
        )
        .unwrap();

        let names: Vec<String> = files
            .iter()
            .map(|p| destination_key(dir.path(), p, "").unwrap())
            .collect();
        assert_eq!(names, vec!["include/css/a.css", "include/css/b.css", "index.html"]);
    }

    #[tokio::test]
    async fn test_unknown_type_is_skipped_not_counted() {
        let dir = site(&["index.html", "notes.zzqx"]);
        let storage = MockStorage::default();
        let store = MemoryMarkerStore::new();
        let mut tracker = tracker(&store);
        let opts = options(&["*"]);

        let report = AssetPublisher::new(dir.path(), &storage, &opts)
            .publish(&mut tracker)
            .await
            .unwrap();

        assert_eq!(report.uploaded, vec!["index.html"]);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].path.ends_with("notes.zzqx"));
        assert_eq!(report.summary(), "1 files uploaded");
        assert!(store.current().is_some());
    }

    #[tokio::test]
    async fn test_abort_policy_keeps_marker() {
        let dir = site(&["a.css", "b.css", "c.css"]);
        let storage = MockStorage::failing("b.css", 1);
        let store = MemoryMarkerStore::new();
        let mut tracker = tracker(&store);
        let opts = options(&["*.css"]);

        let err = AssetPublisher::new(dir.path(), &storage, &opts)
            .publish(&mut tracker)
            .await
            .unwrap_err();

        match err {
            SiteError::Publish { failed_keys, .. } => assert_eq!(failed_keys, vec!["b.css"]),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(storage.keys().await, vec!["a.css"]);
        assert_eq!(store.current(), None);
    }

    #[tokio::test]
    async fn test_continue_policy_aggregates_failures() {
        let dir = site(&["a.css", "b.css", "c.css"]);
        let storage = MockStorage::failing("a.css", 5);
        storage
            .failures
            .lock()
            .await
            .insert("c.css".to_string(), 5);
        let store = MemoryMarkerStore::new();
        let mut tracker = tracker(&store);
        let mut opts = options(&["*.css"]);
        opts.on_failure = FailurePolicy::Continue;

        let err = AssetPublisher::new(dir.path(), &storage, &opts)
            .publish(&mut tracker)
            .await
            .unwrap_err();

        match err {
            SiteError::Publish { failed_keys, .. } => {
                assert_eq!(failed_keys, vec!["a.css", "c.css"])
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(storage.keys().await, vec!["b.css"]);
        assert_eq!(store.current(), None);
    }

    #[tokio::test]
    async fn test_retry_recovers_transient_failure() {
        let dir = site(&["a.js"]);
        let storage = MockStorage::failing("a.js", 2);
        let store = MemoryMarkerStore::new();
        let mut tracker = tracker(&store);
        let mut opts = options(&["*.js"]);
        opts.max_retries = 2;

        let report = AssetPublisher::new(dir.path(), &storage, &opts)
            .publish(&mut tracker)
            .await
            .unwrap();
        assert_eq!(report.uploaded_count(), 1);
        assert!(store.current().is_some());
    }

    #[tokio::test]
    async fn test_prefix_applied_to_keys() {
        let dir = site(&["include/css/main.css"]);
        let storage = MockStorage::default();
        let store = MemoryMarkerStore::new();
        let mut tracker = tracker(&store);
        let mut opts = options(&["include/css/*.css"]);
        opts.prefix = "staging".to_string();

        AssetPublisher::new(dir.path(), &storage, &opts)
            .publish(&mut tracker)
            .await
            .unwrap();
        let uploads = storage.uploads.lock().await.clone();
        assert_eq!(
            uploads,
            vec![(
                "staging/include/css/main.css".to_string(),
                "text/css".to_string()
            )]
        );
    }
}

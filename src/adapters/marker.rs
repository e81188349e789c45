use crate::domain::model::{format_marker, parse_marker, MarkerReadError};
use crate::domain::ports::MarkerStore;
use crate::utils::error::{Result, SiteError};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Marker kept in a one-line text file (`ts.txt` under the site root).
#[derive(Debug, Clone)]
pub struct FileMarkerStore {
    path: PathBuf,
}

impl FileMarkerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MarkerStore for FileMarkerStore {
    fn get(&self) -> std::result::Result<NaiveDateTime, MarkerReadError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MarkerReadError::Missing)
            }
            Err(e) => return Err(MarkerReadError::Io(e)),
        };

        // 只看第一行
        let first_line = content.lines().next().unwrap_or_default();
        parse_marker(first_line).map_err(|source| MarkerReadError::Parse {
            raw: first_line.to_string(),
            source,
        })
    }

    fn set(&self, ts: NaiveDateTime) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SiteError::file(parent, e))?;
        }
        std::fs::write(&self.path, format_marker(&ts)).map_err(|e| SiteError::file(&self.path, e))
    }
}

/// In-memory marker. Clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct MemoryMarkerStore {
    value: Arc<Mutex<Option<NaiveDateTime>>>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marker(ts: NaiveDateTime) -> Self {
        Self {
            value: Arc::new(Mutex::new(Some(ts))),
        }
    }

    pub fn current(&self) -> Option<NaiveDateTime> {
        self.value.lock().ok().and_then(|v| *v)
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn get(&self) -> std::result::Result<NaiveDateTime, MarkerReadError> {
        self.current().ok_or(MarkerReadError::Missing)
    }

    fn set(&self, ts: NaiveDateTime) -> Result<()> {
        let mut guard = self.value.lock().map_err(|_| SiteError::ConfigError {
            message: "marker store lock poisoned".to_string(),
        })?;
        *guard = Some(ts);
        Ok(())
    }
}

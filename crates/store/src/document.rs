//! Filesystem store for generated documents.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;

use doc_agent_core::{traits::DocumentStore, Error, Result};

/// Longest sanitized title kept in a file name, in characters.
pub const MAX_TITLE_CHARS: usize = 80;

/// Saves documents as `YYYYMMDD_HHMMSS_<sanitized-title>.<ext>` under a root directory.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name for `suggested_name` (`<title>.<ext>`) at `timestamp`, without collision suffix.
    pub fn file_name(timestamp: DateTime<Utc>, suggested_name: &str) -> (String, String) {
        let path = Path::new(suggested_name);
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(sanitize_extension)
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "txt".to_string());
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(suggested_name);

        let stem = format!("{}_{}", timestamp.format("%Y%m%d_%H%M%S"), sanitize_title(title));
        (stem, extension)
    }

    /// Create `path` exclusively and write `bytes`; a partial file is removed on error.
    async fn write_new(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;

        let written = async {
            file.write_all(bytes).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = tokio::fs::remove_file(path).await {
                tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove partial document");
            }
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn save(&self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            Error::storage(format!("cannot create {}: {}", self.root.display(), e))
        })?;

        let (stem, extension) = Self::file_name(Utc::now(), suggested_name);

        // Same title within the same second gets a numeric suffix.
        for attempt in 0..1000u32 {
            let name = if attempt == 0 {
                format!("{}.{}", stem, extension)
            } else {
                format!("{}_{}.{}", stem, attempt, extension)
            };
            let path = self.root.join(name);

            match Self::write_new(&path, bytes).await {
                Ok(()) => {
                    tracing::info!(path = %path.display(), size = bytes.len(), "Document saved");
                    return Ok(path);
                }
                Err(e) if e.kind() == IoErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(Error::storage(format!("cannot write {}: {}", path.display(), e)))
                }
            }
        }

        Err(Error::storage(format!("no free file name for '{}'", stem)))
    }
}

/// Keep alphanumerics, `-` and `_`; spaces become `_`.
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let joined = kept.split_whitespace().collect::<Vec<_>>().join("_");
    let truncated: String = joined.chars().take(MAX_TITLE_CHARS).collect();
    let trimmed = truncated.trim_matches('_');

    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.to_string()
    }
}

fn sanitize_extension(extension: &str) -> String {
    extension
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(10)
        .collect::<String>()
        .to_ascii_lowercase()
}

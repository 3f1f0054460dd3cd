//! # Upload Store
//!
//! Persists uploads under `<root>/<category>/<file name>`. Files with the same
//! name overwrite each other (last writer wins). After every save, the oldest
//! files in the category directory are evicted so that at most
//! `max_files_per_category` remain.

use crate::{errors::UploadError, types::SourceKind};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_files_per_category: usize,
}

impl UploadStore {
    /// `max_files_per_category == 0` disables eviction.
    pub fn new(root: impl Into<PathBuf>, max_files_per_category: usize) -> Self {
        Self {
            root: root.into(),
            max_files_per_category,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, kind: SourceKind) -> PathBuf {
        self.root.join(kind.upload_category())
    }

    /// Writes `bytes` for an upload named `file_name` and returns where it landed.
    pub async fn save(
        &self,
        kind: SourceKind,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, UploadError> {
        let name = sanitize_file_name(file_name)?;
        let dir = self.category_dir(kind);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| UploadError::Io {
                path: dir.clone(),
                source,
            })?;

        let path = dir.join(&name);
        // Write then rename, so a concurrent reader never sees a half-written file.
        let partial = dir.join(format!(".{name}.{}.part", Uuid::new_v4()));
        tokio::fs::write(&partial, bytes)
            .await
            .map_err(|source| UploadError::Io {
                path: partial.clone(),
                source,
            })?;
        if let Err(source) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(UploadError::Io { path, source });
        }

        info!(path = %path.display(), bytes = bytes.len(), "Stored upload");

        if self.max_files_per_category > 0 {
            enforce_retention(&dir, self.max_files_per_category, &path).await;
        }
        Ok(path)
    }
}

/// Reduces a client-supplied file name to a safe final path component.
///
/// Blank names are rejected; names that reduce to nothing usable (`..`) get a
/// generated name instead.
pub fn sanitize_file_name(file_name: &str) -> Result<String, UploadError> {
    let trimmed = file_name.trim();
    if trimmed.is_empty() {
        return Err(UploadError::EmptyFilename);
    }
    // Browsers on Windows may send a full client path.
    let last = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim()
        .trim_start_matches('.');
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    if cleaned.is_empty() {
        return Ok(format!("upload-{}", Uuid::new_v4()));
    }
    Ok(cleaned)
}

async fn enforce_retention(dir: &Path, keep: usize, protect: &Path) {
    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Could not list upload directory for retention");
            return;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Could not read upload directory entry");
                break;
            }
        };
        // In-flight ".part" files belong to other requests.
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((modified, entry.path()));
    }

    if files.len() <= keep {
        return;
    }

    files.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    let mut excess = files.len() - keep;
    for (_, path) in files {
        if excess == 0 {
            break;
        }
        if path == protect {
            continue;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Evicted old upload");
                excess -= 1;
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Could not evict old upload"),
        }
    }
}

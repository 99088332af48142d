//! Stat inspection: existence probes and normalized entry descriptors

use crate::error::ContentResult;
use crate::paths::{PathResolver, VirtualPath};
use crate::types::{EntryStats, EntryType};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Reads entry metadata fresh from disk on every call
#[derive(Debug, Clone)]
pub struct StatInspector {
    resolver: PathResolver,
}

impl StatInspector {
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Cheap existence probe; any error counts as absent
    pub async fn exists(&self, path: &VirtualPath) -> bool {
        tokio::fs::metadata(self.resolver.resolve(path)).await.is_ok()
    }

    /// Full descriptor for `path`, or `None` when nothing is there
    pub async fn stat(&self, path: &VirtualPath) -> ContentResult<Option<EntryStats>> {
        if !self.exists(path).await {
            return Ok(None);
        }

        let full_path = self.resolver.resolve(path);
        let meta = match tokio::fs::metadata(&full_path).await {
            Ok(meta) => meta,
            // removed since the probe
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let writeable = is_writeable(&full_path).await;

        let entry_type = if meta.is_dir() {
            Some(EntryType::Directory)
        } else if meta.is_file() {
            Some(EntryType::File)
        } else {
            None
        };

        let last_modified = meta.modified().unwrap_or(UNIX_EPOCH);
        let created = meta.created().unwrap_or(last_modified);

        Ok(Some(EntryStats {
            path: path.as_str().to_string(),
            entry_type,
            created: timestamp(created),
            last_modified: timestamp(last_modified),
            size: meta.len(),
            name: path.name().to_string(),
            writeable,
        }))
    }
}

fn timestamp(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Permission probe independent of the metadata call
#[cfg(unix)]
pub(crate) async fn is_writeable(full_path: &Path) -> bool {
    use nix::unistd::{access, AccessFlags};

    let full_path: PathBuf = full_path.to_path_buf();
    tokio::task::spawn_blocking(move || access(full_path.as_path(), AccessFlags::W_OK).is_ok())
        .await
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub(crate) async fn is_writeable(full_path: &Path) -> bool {
    tokio::fs::metadata(full_path)
        .await
        .map(|meta| !meta.permissions().readonly())
        .unwrap_or(false)
}

//! Flat-file store: a JSON array of link records on local disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use linkforge_shared::{LinkForgeError, PersistedLink, Result};

use crate::LinkStore;

/// Local JSON-array link store.
///
/// Reads merge into writes for single-process use; no file locking is
/// guaranteed. A missing file reads as an empty store.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<Vec<PersistedLink>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| LinkForgeError::io(&self.path, e))?;

        serde_json::from_str(&content).map_err(|e| {
            LinkForgeError::Storage(format!(
                "invalid link file {}: {e}",
                self.path.display()
            ))
        })
    }

    fn write_all(&self, records: &[PersistedLink]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LinkForgeError::io(parent, e))?;
            }
        }

        let json = serde_json::to_string_pretty(records)
            .map_err(|e| LinkForgeError::Storage(e.to_string()))?;

        // Write to a sibling temp file, then rename over the target, so a
        // crash mid-write never truncates the existing store.
        let tmp = tmp_path(&self.path);
        std::fs::write(&tmp, json).map_err(|e| LinkForgeError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| LinkForgeError::io(&self.path, e))?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl LinkStore for FileStore {
    async fn list(&self) -> Result<Vec<PersistedLink>> {
        self.read_all()
    }

    async fn upsert(&self, records: &[PersistedLink]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut existing = self.read_all()?;

        for record in records {
            match existing.iter_mut().find(|r| r.slug == record.slug) {
                Some(slot) => *slot = record.clone(),
                None => existing.push(record.clone()),
            }
        }

        debug!(
            path = %self.path.display(),
            upserted = records.len(),
            total = existing.len(),
            "wrote link file"
        );
        self.write_all(&existing)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<PersistedLink>> {
        Ok(self.read_all()?.into_iter().find(|r| r.slug == slug))
    }
}

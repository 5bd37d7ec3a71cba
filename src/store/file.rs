//! [`GraphStore`] backed by one JSON file per document.
//!
//! Documents live at `<root>/<document-id>.json` as pretty-printed JSON.
//! Every write is atomic (write-to-temp + fsync + rename) so a crash never
//! leaves a half-written document behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{GraphStore, StoreError, apply};
use crate::error::GraphError;
use crate::graph::GraphSnapshot;
use crate::model::DocumentId;

/// Stores documents as JSON files in a directory.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// A store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `document`.
    #[must_use]
    pub fn path_for(&self, document: DocumentId) -> PathBuf {
        self.root.join(format!("{document}.json"))
    }

    /// Ids of every stored document, ascending.
    ///
    /// # Errors
    /// `Io` if the directory exists but cannot be read.
    pub async fn list(&self) -> Result<Vec<DocumentId>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ids),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source,
                });
            }
        };
        while let Some(entry) = entries.next_entry().await.map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(id) = stem.parse() {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn read(&self, document: DocumentId) -> Result<GraphSnapshot, StoreError> {
        let path = self.path_for(document);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::DocumentNotFound(document));
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let snapshot: GraphSnapshot =
            serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                path: path.clone(),
                detail: e.to_string(),
            })?;
        if snapshot.document.id != document {
            return Err(StoreError::Corrupt {
                path,
                detail: format!("file holds document {}", snapshot.document.id),
            });
        }
        Ok(snapshot)
    }

    async fn write_atomic(&self, snapshot: &GraphSnapshot) -> Result<(), StoreError> {
        let path = self.path_for(snapshot.document.id);
        let io = |path: &Path| {
            let path = path.to_owned();
            move |source| StoreError::Io { path, source }
        };
        let json = serde_json::to_string_pretty(snapshot).map_err(|e| StoreError::Corrupt {
            path: path.clone(),
            detail: e.to_string(),
        })?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(io(&self.root))?;

        // Same directory, so the rename stays on one filesystem.
        let tmp_path = self.root.join(format!(".{}.json.tmp", snapshot.document.id));
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(io(&tmp_path))?;
        file.write_all(json.as_bytes())
            .await
            .map_err(io(&tmp_path))?;
        file.sync_all().await.map_err(io(&tmp_path))?;
        drop(file);

        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(io(&path))?;
        Ok(())
    }
}

impl GraphStore for JsonFileStore {
    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    async fn fetch(&self, document: DocumentId) -> Result<GraphSnapshot, StoreError> {
        self.read(document).await
    }

    #[tracing::instrument(skip_all, fields(document = %snapshot.document.id))]
    async fn insert(&self, snapshot: GraphSnapshot) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let id = snapshot.document.id;
        match self.read(id).await {
            Ok(_) | Err(StoreError::Corrupt { .. }) => {
                return Err(GraphError::Conflict(format!("document {id} already exists")).into());
            }
            Err(StoreError::DocumentNotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.write_atomic(&snapshot).await
    }

    #[tracing::instrument(skip(self, op), fields(root = %self.root.display()))]
    async fn update<T, F>(&self, document: DocumentId, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut GraphSnapshot) -> Result<T, GraphError>,
    {
        let _guard = self.write_lock.lock().await;
        let current = self.read(document).await?;
        let (next, value) = apply(&current, op)?;
        self.write_atomic(&next).await?;
        tracing::debug!(commits = next.commits.len(), "document written");
        Ok(value)
    }
}

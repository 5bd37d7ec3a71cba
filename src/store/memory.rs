//! In-memory [`GraphStore`].

use std::collections::BTreeMap;

use tokio::sync::Mutex;

use super::{GraphStore, StoreError, apply};
use crate::error::GraphError;
use crate::graph::GraphSnapshot;
use crate::model::DocumentId;

/// Keeps every document in a map behind an async mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<DocumentId, GraphSnapshot>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `snapshot`.
    #[must_use]
    pub fn with_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut documents = BTreeMap::new();
        documents.insert(snapshot.document.id, snapshot);
        Self {
            documents: Mutex::new(documents),
        }
    }

    /// Overwrite a stored document without any checks.
    pub async fn replace(&self, snapshot: GraphSnapshot) {
        self.documents
            .lock()
            .await
            .insert(snapshot.document.id, snapshot);
    }
}

impl GraphStore for MemoryStore {
    async fn fetch(&self, document: DocumentId) -> Result<GraphSnapshot, StoreError> {
        self.documents
            .lock()
            .await
            .get(&document)
            .cloned()
            .ok_or(StoreError::DocumentNotFound(document))
    }

    async fn insert(&self, snapshot: GraphSnapshot) -> Result<(), StoreError> {
        let mut documents = self.documents.lock().await;
        let id = snapshot.document.id;
        if documents.contains_key(&id) {
            return Err(GraphError::Conflict(format!("document {id} already exists")).into());
        }
        documents.insert(id, snapshot);
        Ok(())
    }

    async fn update<T, F>(&self, document: DocumentId, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut GraphSnapshot) -> Result<T, GraphError>,
    {
        let mut documents = self.documents.lock().await;
        let current = documents
            .get(&document)
            .ok_or(StoreError::DocumentNotFound(document))?;
        let (next, value) = apply(current, op)?;
        documents.insert(document, next);
        Ok(value)
    }
}

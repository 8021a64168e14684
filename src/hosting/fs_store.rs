//! Filesystem-backed document store.
//!
//! Documents live at `<root>/<collection>/<id>.json`. This is the local
//! backend; a cloud deployment substitutes its own [`DocumentStore`].

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

use super::DocumentStore;

/// Document store writing pretty-printed JSON files.
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    /// Creates a store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, collection: &str, id: &str) -> PathBuf {
        self.root.join(collection).join(format!("{id}.json"))
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn put(&self, collection: &str, id: &str, document: &Value) -> Result<(), StoreError> {
        let path = self.path_for(collection, id);
        let put_err = |message: String| StoreError::Put {
            collection: collection.to_string(),
            id: id.to_string(),
            message,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| put_err(e.to_string()))?;
        }

        let body = serde_json::to_vec_pretty(document).map_err(|e| put_err(e.to_string()))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| put_err(e.to_string()))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(collection, id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Get {
                    collection: collection.to_string(),
                    id: id.to_string(),
                    message: e.to_string(),
                });
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Get {
                collection: collection.to_string(),
                id: id.to_string(),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsDocumentStore::new(dir.path());
        let doc = serde_json::json!({"id": "r-1", "title": "Report"});

        store.put("research_reports", "r-1", &doc).await.unwrap();
        let read = store.get("research_reports", "r-1").await.unwrap();
        assert_eq!(read, Some(doc));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsDocumentStore::new(dir.path());
        assert!(store.get("research_reports", "nope").await.unwrap().is_none());
    }
}

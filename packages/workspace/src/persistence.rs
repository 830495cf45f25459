//! Where sync batches go.
//!
//! [`HttpPersistence`] talks to a persistence server over HTTP;
//! [`MemoryPersistence`] applies batches to an in-process
//! [`ProjectStore`], the same store the reference server uses.

use crate::errors::SyncError;
use crate::project_store::{PersistResponse, ProjectStore, SyncBatch, TreeDocument};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub trait Persistence: Send + Sync + 'static {
    /// Send one batch of patches
    fn persist(&self, batch: SyncBatch) -> BoxFuture<'static, Result<(), SyncError>>;

    /// Current document of a tree, `None` if it was never seeded
    fn fetch(&self, project_id: &str, tree_id: &str)
        -> BoxFuture<'static, Result<Option<TreeDocument>, SyncError>>;

    /// Store a complete document for a tree
    fn seed(
        &self,
        project_id: &str,
        tree_id: &str,
        document: TreeDocument,
    ) -> BoxFuture<'static, Result<(), SyncError>>;
}

#[derive(Debug, Clone)]
pub struct HttpPersistence {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPersistence {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn patch_url(&self) -> String {
        format!("{}/rest/patch", self.endpoint)
    }

    pub fn tree_url(&self, project_id: &str, tree_id: &str) -> String {
        format!("{}/rest/tree/{}/{}", self.endpoint, project_id, tree_id)
    }
}

impl Persistence for HttpPersistence {
    fn persist(&self, batch: SyncBatch) -> BoxFuture<'static, Result<(), SyncError>> {
        let request = self.client.post(self.patch_url()).json(&batch);
        async move {
            let response = request.send().await?;
            let status = response.status();
            let body: PersistResponse = match response.json().await {
                Ok(body) => body,
                Err(_) if !status.is_success() => return Err(SyncError::Status(status.as_u16())),
                Err(e) => return Err(e.into()),
            };
            if body.ok {
                Ok(())
            } else {
                Err(SyncError::Rejected(body.error.unwrap_or_else(|| status.to_string())))
            }
        }
        .boxed()
    }

    fn fetch(
        &self,
        project_id: &str,
        tree_id: &str,
    ) -> BoxFuture<'static, Result<Option<TreeDocument>, SyncError>> {
        let request = self.client.get(self.tree_url(project_id, tree_id));
        async move {
            let response = request.send().await?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !response.status().is_success() {
                return Err(SyncError::Status(response.status().as_u16()));
            }
            Ok(Some(response.json().await?))
        }
        .boxed()
    }

    fn seed(
        &self,
        project_id: &str,
        tree_id: &str,
        document: TreeDocument,
    ) -> BoxFuture<'static, Result<(), SyncError>> {
        let request = self.client.put(self.tree_url(project_id, tree_id)).json(&document);
        async move {
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(SyncError::Status(response.status().as_u16()));
            }
            Ok(())
        }
        .boxed()
    }
}

/// Shared handle on a [`ProjectStore`]
pub type SharedProjectStore = Arc<Mutex<ProjectStore>>;

pub(crate) fn lock_store(store: &SharedProjectStore) -> MutexGuard<'_, ProjectStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    store: SharedProjectStore,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: SharedProjectStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> SharedProjectStore {
        self.store.clone()
    }
}

impl Persistence for MemoryPersistence {
    fn persist(&self, batch: SyncBatch) -> BoxFuture<'static, Result<(), SyncError>> {
        let result = lock_store(&self.store).apply(&batch).map(|_| ()).map_err(SyncError::from);
        futures::future::ready(result).boxed()
    }

    fn fetch(
        &self,
        project_id: &str,
        tree_id: &str,
    ) -> BoxFuture<'static, Result<Option<TreeDocument>, SyncError>> {
        let result = lock_store(&self.store)
            .document(project_id, tree_id)
            .map_err(SyncError::from);
        futures::future::ready(result).boxed()
    }

    fn seed(
        &self,
        project_id: &str,
        tree_id: &str,
        document: TreeDocument,
    ) -> BoxFuture<'static, Result<(), SyncError>> {
        let result = lock_store(&self.store)
            .seed(project_id, tree_id, &document)
            .map_err(SyncError::from);
        futures::future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_model::IdGenerator;

    #[test]
    fn test_urls() {
        let http = HttpPersistence::new("http://localhost:3030/");
        assert_eq!(http.patch_url(), "http://localhost:3030/rest/patch");
        assert_eq!(http.tree_url("p", "t"), "http://localhost:3030/rest/tree/p/t");
    }

    #[tokio::test]
    async fn test_memory_roundtrip() {
        let persistence = MemoryPersistence::new();
        assert!(persistence.fetch("p", "t").await.unwrap().is_none());

        let document = TreeDocument::new_default(&mut IdGenerator::from_seed("m")).unwrap();
        persistence.seed("p", "t", document.clone()).await.unwrap();
        assert_eq!(persistence.fetch("p", "t").await.unwrap(), Some(document));

        let missing = SyncBatch::new("p", "other", vec![]);
        assert!(matches!(persistence.persist(missing).await, Err(SyncError::Store(_))));
    }
}

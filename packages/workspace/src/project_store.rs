//! Server-side document storage.
//!
//! Holds one document per `(projectId, treeId)` as raw JSON containers and
//! applies sync batches to it. A batch is applied all-or-nothing, and a
//! `batchId` that was already applied is acknowledged without being
//! applied again.

use crate::errors::ProjectStoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use studio_editor::{patch, DocumentStore, EditorError, InstanceTree, Namespace, Transaction};
use studio_model::{create_root_instance, Breakpoints, IdGenerator, PropsStore};

/// Full persisted state of one tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDocument {
    pub root: InstanceTree,
    pub props: PropsStore,
    pub breakpoints: Breakpoints,
}

impl TreeDocument {
    /// Fresh document: an empty body and the default breakpoints
    pub fn new_default(ids: &mut IdGenerator) -> Result<Self, EditorError> {
        let breakpoints = Breakpoints::defaults();
        let root = InstanceTree::new(create_root_instance(ids, &breakpoints)?)?;

        Ok(Self {
            root,
            props: PropsStore::new(),
            breakpoints,
        })
    }

    pub fn from_store(store: &DocumentStore) -> Self {
        Self {
            root: store.tree().as_ref().clone(),
            props: store.props().as_ref().clone(),
            breakpoints: store.breakpoints().as_ref().clone(),
        }
    }

    pub fn into_store(self) -> DocumentStore {
        DocumentStore::new(self.root, self.props, self.breakpoints)
    }
}

/// Patches harvested from the store, sent as one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncBatch {
    pub batch_id: String,
    pub transactions: Vec<Transaction>,
    pub tree_id: String,
    pub project_id: String,
}

impl SyncBatch {
    pub fn new(
        project_id: impl Into<String>,
        tree_id: impl Into<String>,
        transactions: Vec<Transaction>,
    ) -> Self {
        Self {
            batch_id: uuid::Uuid::new_v4().to_string(),
            transactions,
            tree_id: tree_id.into(),
            project_id: project_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PersistResponse {
    pub fn ok() -> Self {
        Self { ok: true, error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The batch id had been applied before; nothing changed
    Duplicate,
}

/// Stored document as returned by `GET /rest/tree/...`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub root: Value,
    pub props: Value,
    pub breakpoints: Value,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// How many recent batch ids each tree remembers for deduplication
pub const APPLIED_BATCH_HISTORY: usize = 1024;

/// Most recent batch ids, oldest evicted first
#[derive(Debug, Clone, Default)]
struct AppliedBatches {
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl AppliedBatches {
    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn insert(&mut self, id: String) {
        if !self.ids.insert(id.clone()) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > APPLIED_BATCH_HISTORY {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }
}

#[derive(Debug, Clone)]
struct StoredTree {
    containers: BTreeMap<Namespace, Value>,
    applied_batches: AppliedBatches,
    version: u64,
    updated_at: DateTime<Utc>,
}

impl StoredTree {
    fn container(&self, namespace: Namespace) -> Value {
        self.containers.get(&namespace).cloned().unwrap_or(Value::Null)
    }
}

type TreeKey = (String, String);

fn key(project_id: &str, tree_id: &str) -> TreeKey {
    (project_id.to_string(), tree_id.to_string())
}

#[derive(Debug, Default)]
pub struct ProjectStore {
    trees: HashMap<TreeKey, StoredTree>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Store `document` as the current state of the tree, replacing any
    /// previous one
    pub fn seed(
        &mut self,
        project_id: &str,
        tree_id: &str,
        document: &TreeDocument,
    ) -> Result<(), ProjectStoreError> {
        let to_value = |value: Result<Value, serde_json::Error>| {
            value.map_err(|e| ProjectStoreError::InvalidDocument(e.to_string()))
        };

        let mut containers = BTreeMap::new();
        containers.insert(Namespace::Root, to_value(serde_json::to_value(&document.root))?);
        containers.insert(Namespace::Props, to_value(serde_json::to_value(&document.props))?);
        containers.insert(
            Namespace::Breakpoints,
            to_value(serde_json::to_value(&document.breakpoints))?,
        );

        self.trees.insert(
            key(project_id, tree_id),
            StoredTree {
                containers,
                applied_batches: AppliedBatches::default(),
                version: 0,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    pub fn get(&self, project_id: &str, tree_id: &str) -> Option<StoredDocument> {
        let tree = self.trees.get(&key(project_id, tree_id))?;
        Some(StoredDocument {
            root: tree.container(Namespace::Root),
            props: tree.container(Namespace::Props),
            breakpoints: tree.container(Namespace::Breakpoints),
            version: tree.version,
            updated_at: tree.updated_at,
        })
    }

    /// Typed copy of the stored document
    pub fn document(&self, project_id: &str, tree_id: &str) -> Result<Option<TreeDocument>, ProjectStoreError> {
        let Some(stored) = self.get(project_id, tree_id) else {
            return Ok(None);
        };
        let document = TreeDocument {
            root: parse(stored.root)?,
            props: parse(stored.props)?,
            breakpoints: parse(stored.breakpoints)?,
        };
        Ok(Some(document))
    }

    /// Apply every transaction of `batch`, or none of them
    pub fn apply(&mut self, batch: &SyncBatch) -> Result<ApplyOutcome, ProjectStoreError> {
        let tree = self
            .trees
            .get_mut(&key(&batch.project_id, &batch.tree_id))
            .ok_or_else(|| ProjectStoreError::TreeNotFound {
                project_id: batch.project_id.clone(),
                tree_id: batch.tree_id.clone(),
            })?;

        if tree.applied_batches.contains(&batch.batch_id) {
            return Ok(ApplyOutcome::Duplicate);
        }

        let mut staged = tree.containers.clone();
        for transaction in &batch.transactions {
            for entry in transaction {
                let container = staged.entry(entry.namespace).or_insert(Value::Null);
                patch::apply(container, &entry.patches).map_err(|source| ProjectStoreError::Patch {
                    namespace: entry.namespace,
                    source,
                })?;
            }
        }

        let root: InstanceTree = parse(staged.get(&Namespace::Root).cloned().unwrap_or(Value::Null))?;
        root.check_invariants()
            .map_err(|e| ProjectStoreError::InvalidDocument(e.to_string()))?;

        tree.containers = staged;
        tree.applied_batches.insert(batch.batch_id.clone());
        tree.version += 1;
        tree.updated_at = Utc::now();
        Ok(ApplyOutcome::Applied)
    }
}

fn parse<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ProjectStoreError> {
    serde_json::from_value(value).map_err(|e| ProjectStoreError::InvalidDocument(e.to_string()))
}

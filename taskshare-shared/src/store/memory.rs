/// In-memory document store
///
/// Keeps every collection in a `BTreeMap` keyed by document id, so query
/// results come back in id order. Used by the test suites and by
/// `STORAGE_BACKEND=memory` local runs.
///
/// The store can be told to fail writes or queries on a collection, which lets
/// tests exercise the partial-failure paths of the membership manager and the
/// visibility aggregator.

use super::{Collection, Document, DocumentStore, FieldMap, StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Faults {
    writes: HashSet<Collection>,
    queries: HashSet<Collection>,
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<Collection, BTreeMap<String, Document>>,
    faults: Faults,
}

/// Cloneable handle to a shared in-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write (set, merge, delete) on `collection` fail
    pub async fn fail_writes_to(&self, collection: Collection) {
        self.inner.write().await.faults.writes.insert(collection);
    }

    /// Makes every subsequent query on `collection` fail
    pub async fn fail_queries_on(&self, collection: Collection) {
        self.inner.write().await.faults.queries.insert(collection);
    }

    /// Clears all injected faults
    pub async fn clear_faults(&self) {
        let mut inner = self.inner.write().await;
        inner.faults = Faults::default();
    }

    /// Number of documents currently held in `collection`
    pub async fn len(&self, collection: Collection) -> usize {
        self.inner
            .read()
            .await
            .collections
            .get(&collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Whether `collection` holds no documents
    pub async fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection).await == 0
    }
}

impl Inner {
    fn check_write(&self, collection: Collection) -> StoreResult<()> {
        if self.faults.writes.contains(&collection) {
            return Err(StoreError::Backend(format!(
                "injected write failure on {}",
                collection
            )));
        }
        Ok(())
    }

    fn check_query(&self, collection: Collection) -> StoreResult<()> {
        if self.faults.queries.contains(&collection) {
            return Err(StoreError::Backend(format!(
                "injected query failure on {}",
                collection
            )));
        }
        Ok(())
    }

    fn scan<F>(&self, collection: Collection, predicate: F) -> Vec<Document>
    where
        F: Fn(&Document) -> bool,
    {
        self.collections
            .get(&collection)
            .map(|docs| docs.values().filter(|d| predicate(d)).cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set(&self, collection: Collection, id: &str, document: Document) -> StoreResult<()> {
        if !document.is_object() {
            return Err(StoreError::Malformed {
                collection,
                id: id.to_string(),
            });
        }

        let mut inner = self.inner.write().await;
        inner.check_write(collection)?;
        inner
            .collections
            .entry(collection)
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn merge_fields(
        &self,
        collection: Collection,
        id: &str,
        fields: FieldMap,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.check_write(collection)?;

        let document = inner
            .collections
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })?;

        let object = document.as_object_mut().ok_or_else(|| StoreError::Malformed {
            collection,
            id: id.to_string(),
        })?;

        for (field, value) in fields {
            object.insert(field, value);
        }
        Ok(())
    }

    async fn query_equals(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>> {
        let inner = self.inner.read().await;
        inner.check_query(collection)?;
        Ok(inner.scan(collection, |doc| doc.get(field) == Some(value)))
    }

    async fn query_array_contains(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>> {
        let inner = self.inner.read().await;
        inner.check_query(collection)?;
        Ok(inner.scan(collection, |doc| {
            doc.get(field)
                .and_then(Value::as_array)
                .map(|items| items.contains(value))
                .unwrap_or(false)
        }))
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.check_write(collection)?;
        if let Some(docs) = inner.collections.get_mut(&collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

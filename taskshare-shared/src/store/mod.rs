/// Document store contract
///
/// The core never talks to a database directly. It consumes a narrow
/// document-store interface modelled on a record store that offers
/// get / set / merge-fields / query-by-field / array-contains / delete over
/// JSON documents grouped into collections.
///
/// # Backends
///
/// - [`memory::MemoryStore`]: in-process maps, used by tests and local runs
/// - [`postgres::PgDocumentStore`]: a JSONB `documents` table
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use taskshare_shared::store::{Collection, DocumentStore, memory::MemoryStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
/// store.set(Collection::Users, "u-1", json!({"id": "u-1", "username": "ana"})).await?;
///
/// let found = store
///     .query_equals(Collection::Users, "username", &json!("ana"))
///     .await?;
/// assert_eq!(found.len(), 1);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A stored record: always a JSON object
pub type Document = Value;

/// Partial update payload for [`DocumentStore::merge_fields`]
pub type FieldMap = Map<String, Value>;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Collections known to the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Users,
    Tasks,
    Groups,
}

impl Collection {
    /// Collection name as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Tasks => "tasks",
            Collection::Groups => "groups",
        }
    }

    /// Singular entity name, for error messages
    pub fn entity_name(&self) -> &'static str {
        match self {
            Collection::Users => "User",
            Collection::Tasks => "Task",
            Collection::Groups => "Group",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a document store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A write addressed a document that does not exist
    #[error("{} {} not found", .collection.entity_name(), .id)]
    NotFound { collection: Collection, id: String },

    /// A document could not be converted to or from its typed form
    #[error("Document encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A stored document is not a JSON object
    #[error("Malformed document {collection}/{id}")]
    Malformed { collection: Collection, id: String },

    /// The backend rejected or failed the operation
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Narrow read/write interface over a document store
///
/// Implementations own their timeout and retry policy; callers never retry.
/// No operation spans more than one document, and there is no
/// compare-and-swap: concurrent writers to the same document race.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document, `None` if absent
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>>;

    /// Creates or fully replaces a document
    async fn set(&self, collection: Collection, id: &str, document: Document) -> StoreResult<()>;

    /// Overwrites the given top-level fields of an existing document
    ///
    /// Fails with [`StoreError::NotFound`] if the document is absent.
    async fn merge_fields(
        &self,
        collection: Collection,
        id: &str,
        fields: FieldMap,
    ) -> StoreResult<()>;

    /// Documents whose top-level `field` equals `value`
    async fn query_equals(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>>;

    /// Documents whose top-level array `field` contains `value`
    async fn query_array_contains(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>>;

    /// Removes a document; removing an absent document is not an error
    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()>;

    /// Connectivity probe used by health checks
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Converts a typed value into a storable document
pub fn encode<T: Serialize>(value: &T) -> StoreResult<Document> {
    Ok(serde_json::to_value(value)?)
}

/// Converts a stored document into its typed form
pub fn decode<T: DeserializeOwned>(document: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(document)?)
}

/// Fetches and decodes a document
pub async fn fetch<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
) -> StoreResult<Option<T>> {
    match store.get(collection, id).await? {
        Some(document) => decode(document).map(Some),
        None => Ok(None),
    }
}

/// Encodes and fully replaces a document
pub async fn put<T: Serialize>(
    store: &dyn DocumentStore,
    collection: Collection,
    id: &str,
    value: &T,
) -> StoreResult<()> {
    store.set(collection, id, encode(value)?).await
}

/// Decodes query results, skipping documents that do not match the type
///
/// Undecodable documents are logged and dropped rather than failing the
/// whole query.
pub fn decode_all<T: DeserializeOwned>(collection: Collection, documents: Vec<Document>) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("<unknown>")
                .to_string();
            match decode::<T>(document) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(
                        collection = %collection,
                        document_id = %id,
                        error = %e,
                        "Skipping undecodable document"
                    );
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Probe {
        id: String,
        count: u32,
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(Collection::Users.as_str(), "users");
        assert_eq!(Collection::Tasks.to_string(), "tasks");
        assert_eq!(Collection::Groups.entity_name(), "Group");
    }

    #[test]
    fn test_decode_all_skips_bad_documents() {
        let docs = vec![
            json!({"id": "a", "count": 1}),
            json!({"id": "b", "count": "not a number"}),
            json!({"id": "c", "count": 3}),
        ];

        let probes: Vec<Probe> = decode_all(Collection::Tasks, docs);
        let ids: Vec<&str> = probes.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_not_found_display() {
        let err = StoreError::NotFound {
            collection: Collection::Tasks,
            id: "t-9".to_string(),
        };
        assert_eq!(err.to_string(), "Task t-9 not found");
    }
}

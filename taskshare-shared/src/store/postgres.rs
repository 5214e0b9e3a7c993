/// Postgres-backed document store
///
/// Documents live in a single JSONB table created by the migrations in
/// `taskshare-shared/migrations`:
///
/// ```sql
/// CREATE TABLE documents (
///     collection TEXT NOT NULL,
///     id TEXT NOT NULL,
///     body JSONB NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (collection, id)
/// );
/// ```
///
/// Equality and array-contains queries are both expressed as JSONB
/// containment (`@>`) so they are served by the GIN index on `body`.
///
/// # Example
///
/// ```no_run
/// use taskshare_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskshare_shared::store::postgres::PgDocumentStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
/// let store = PgDocumentStore::new(pool);
/// # Ok(())
/// # }
/// ```

use super::{Collection, Document, DocumentStore, FieldMap, StoreError, StoreResult};
use crate::db::pool::health_check;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

/// Document store over a Postgres connection pool
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for migrations and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        let body: Option<Value> = sqlx::query_scalar(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(body)
    }

    async fn set(&self, collection: Collection, id: &str, document: Document) -> StoreResult<()> {
        if !document.is_object() {
            return Err(StoreError::Malformed {
                collection,
                id: id.to_string(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(document)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn merge_fields(
        &self,
        collection: Collection,
        id: &str,
        fields: FieldMap,
    ) -> StoreResult<()> {
        // `||` on two JSONB objects replaces top-level keys and keeps the rest
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = body || $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(Value::Object(fields))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn query_equals(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>> {
        let rows: Vec<Value> = sqlx::query_scalar(
            r#"
            SELECT body FROM documents
            WHERE collection = $1
              AND body @> jsonb_build_object($2::text, $3::jsonb)
            ORDER BY id ASC
            "#,
        )
        .bind(collection.as_str())
        .bind(field)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        // Containment also matches arrays holding the value; keep exact matches only
        Ok(rows
            .into_iter()
            .filter(|doc| doc.get(field) == Some(value))
            .collect())
    }

    async fn query_array_contains(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>> {
        let rows: Vec<Value> = sqlx::query_scalar(
            r#"
            SELECT body FROM documents
            WHERE collection = $1
              AND jsonb_typeof(body -> $2::text) = 'array'
              AND body @> jsonb_build_object($2::text, jsonb_build_array($3::jsonb))
            ORDER BY id ASC
            "#,
        )
        .bind(collection.as_str())
        .bind(field)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }
}

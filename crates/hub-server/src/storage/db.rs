//! SQLite document store (embedded, no external dependencies)
//!
//! Every collection lives in one `documents` table holding JSON bodies. Filters
//! compile to `json_extract` comparisons.

use super::{Collection, Document, DocumentStore, Filter, PersistenceError, UpsertOutcome};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database, check it answers, and bootstrap the schema
    pub async fn connect(database_url: &str, timeout: Duration) -> Result<Self, PersistenceError> {
        tracing::info!("Opening SQLite database at: {}", database_url);

        if !database_url.starts_with("sqlite:") {
            return Err(PersistenceError::Unavailable(format!(
                "unsupported store URL: {}",
                database_url
            )));
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        // Each connection to an in-memory database is its own database
        let in_memory = database_url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = tokio::time::timeout(
            timeout,
            pool_options.acquire_timeout(timeout).connect_with(options),
        )
        .await
        .map_err(|_| PersistenceError::Unavailable(format!("connect timed out after {:?}", timeout)))??;

        tracing::info!("SQLite connection established, checking liveness...");

        let (alive,): (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await?;
        if alive != 1 {
            return Err(PersistenceError::Unavailable(
                "liveness check returned an unexpected value".to_string(),
            ));
        }

        Self::run_migrations(&pool).await?;

        tracing::info!("Database initialization complete");

        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents (collection)
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

/// JSON path for a top-level field. Only plain identifiers are accepted.
fn json_path(field: &str) -> Result<String, PersistenceError> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(PersistenceError::InvalidFilter(field.to_string()));
    }
    Ok(format!("$.{}", field))
}

fn push_filter(
    qb: &mut QueryBuilder<'_, Sqlite>,
    collection: Collection,
    filter: &Filter,
) -> Result<(), PersistenceError> {
    qb.push(" WHERE collection = ").push_bind(collection.name());

    for (field, value) in filter.clauses() {
        let path = json_path(field)?;
        if value.is_null() {
            qb.push(" AND json_extract(body, ")
                .push_bind(path)
                .push(") IS NULL");
        } else {
            qb.push(" AND json_extract(body, ")
                .push_bind(path)
                .push(") = json_extract(")
                .push_bind(value.to_string())
                .push(", '$')");
        }
    }

    Ok(())
}

fn encode(doc: &Document) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(doc)?)
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert(&self, collection: Collection, doc: Document) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, body) VALUES (?1, ?2)
            "#,
        )
        .bind(collection.name())
        .bind(encode(&doc)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, PersistenceError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT body FROM documents");
        push_filter(&mut qb, collection, filter)?;
        qb.push(" ORDER BY seq");

        let rows: Vec<(String,)> = qb.build_query_as().fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|(body,)| serde_json::from_str(&body).map_err(PersistenceError::from))
            .collect()
    }

    async fn upsert(
        &self,
        collection: Collection,
        key: &Filter,
        doc: Document,
    ) -> Result<UpsertOutcome, PersistenceError> {
        let body = encode(&doc)?;
        let mut tx = self.pool.begin().await?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT seq FROM documents");
        push_filter(&mut qb, collection, key)?;
        qb.push(" ORDER BY seq LIMIT 1");
        let existing: Option<(i64,)> = qb.build_query_as().fetch_optional(&mut *tx).await?;

        let outcome = match existing {
            Some((seq,)) => {
                sqlx::query(
                    r#"
                    UPDATE documents SET body = ?1, updated_at = CURRENT_TIMESTAMP WHERE seq = ?2
                    "#,
                )
                .bind(body)
                .bind(seq)
                .execute(&mut *tx)
                .await?;
                UpsertOutcome::Replaced
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO documents (collection, body) VALUES (?1, ?2)
                    "#,
                )
                .bind(collection.name())
                .bind(body)
                .execute(&mut *tx)
                .await?;
                UpsertOutcome::Inserted
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<u64, PersistenceError> {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM documents");
        push_filter(&mut qb, collection, filter)?;

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

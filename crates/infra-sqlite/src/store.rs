// SQLite SharedStore Implementation

use async_trait::async_trait;
use helpdesk_core::error::{AppError, Result};
use helpdesk_core::port::{
    Collection, SharedStore, TimeProvider, Version, Versioned, WriteOutcome,
};
use serde_json::Value;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::sync::Arc;
use tracing::debug;

// Helper to convert sqlx::Error to AppError with structured information
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "5" | "517" => {
                        // SQLITE_BUSY - another client holds the write lock
                        AppError::StoreUnavailable(format!(
                            "Database locked (SQLITE_BUSY): {}",
                            db_err.message()
                        ))
                    }
                    "13" => {
                        // SQLITE_FULL - database or disk is full
                        AppError::StoreUnavailable(format!("Database full: {}", db_err.message()))
                    }
                    _ => AppError::StoreUnavailable(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::StoreUnavailable(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::StoreUnavailable("Row not found".to_string()),
        _ => {
            // Connection, pool, protocol errors
            AppError::StoreUnavailable(err.to_string())
        }
    }
}

fn to_version(raw: i64) -> Version {
    raw.max(0) as Version
}

/// Store backed by one SQLite file shared by every client process
pub struct SqliteSharedStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteSharedStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    async fn fetch(
        conn: &mut SqliteConnection,
        collection: Collection,
    ) -> Result<Versioned<Option<Value>>> {
        let row = sqlx::query_as::<_, CollectionRow>(
            "SELECT value, version FROM collections WHERE name = ?",
        )
        .bind(collection.name())
        .fetch_optional(conn)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(Versioned {
                value: Some(serde_json::from_str(&row.value)?),
                version: to_version(row.version),
            }),
            None => Ok(Versioned {
                value: None,
                version: 0,
            }),
        }
    }

    async fn commit(tx: Transaction<'_, Sqlite>) -> Result<()> {
        tx.commit().await.map_err(map_sqlx_error)
    }
}

#[async_trait]
impl SharedStore for SqliteSharedStore {
    async fn read(&self, collection: Collection) -> Result<Versioned<Option<Value>>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        Self::fetch(&mut *conn, collection).await
    }

    async fn write(&self, collection: Collection, value: &Value) -> Result<Version> {
        let now = self.time_provider.now_millis();

        let version: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO collections (name, value, version, updated_at)
            VALUES (?, ?, 1, ?)
            ON CONFLICT(name) DO UPDATE
            SET value = excluded.value,
                version = collections.version + 1,
                updated_at = excluded.updated_at
            RETURNING version
            "#,
        )
        .bind(collection.name())
        .bind(value.to_string())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(collection = %collection, version, "Collection written");
        Ok(to_version(version))
    }

    async fn write_if_version(
        &self,
        collection: Collection,
        value: &Value,
        expected: Version,
    ) -> Result<WriteOutcome> {
        let now = self.time_provider.now_millis();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let written: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE collections
            SET value = ?, version = version + 1, updated_at = ?
            WHERE name = ? AND version = ?
            RETURNING version
            "#,
        )
        .bind(value.to_string())
        .bind(now)
        .bind(collection.name())
        .bind(expected as i64)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        // A never-written collection may not have a row yet
        let written = match written {
            Some(v) => Some(v),
            None if expected == 0 => sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO collections (name, value, version, updated_at)
                VALUES (?, ?, 1, ?)
                ON CONFLICT(name) DO NOTHING
                RETURNING version
                "#,
            )
            .bind(collection.name())
            .bind(value.to_string())
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?,
            None => None,
        };

        match written {
            Some(version) => {
                Self::commit(tx).await?;
                debug!(collection = %collection, version, "Collection written (checked)");
                Ok(WriteOutcome::Written(to_version(version)))
            }
            None => {
                let current = Self::fetch(&mut *tx, collection).await?;
                Self::commit(tx).await?;
                debug!(
                    collection = %collection,
                    expected,
                    found = current.version,
                    "Checked write rejected"
                );
                Ok(WriteOutcome::Conflict(current))
            }
        }
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct CollectionRow {
    value: String, // JSON
    version: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use helpdesk_core::port::time_provider::SystemTimeProvider;
    use serde_json::json;

    async fn setup_test_store() -> SqliteSharedStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteSharedStore::new(pool, Arc::new(SystemTimeProvider))
    }

    #[tokio::test]
    async fn test_fresh_store_has_empty_collections() {
        let store = setup_test_store().await;
        for c in Collection::ALL {
            let read = store.read(c).await.unwrap();
            assert_eq!(read.value, Some(json!([])));
            assert_eq!(read.version, 0);
        }
    }

    #[tokio::test]
    async fn test_write_replaces_and_bumps_version() {
        let store = setup_test_store().await;
        let v1 = store
            .write(Collection::HelpQueue, &json!([{"name": "Ann", "joined_at": 1}]))
            .await
            .unwrap();
        let v2 = store.write(Collection::HelpQueue, &json!([])).await.unwrap();
        assert_eq!((v1, v2), (1, 2));

        let read = store.read(Collection::HelpQueue).await.unwrap();
        assert_eq!(read.value, Some(json!([])));
        assert_eq!(read.version, 2);

        // The other collection is untouched
        assert_eq!(store.read(Collection::Questions).await.unwrap().version, 0);
    }

    #[tokio::test]
    async fn test_checked_write_conflict_returns_current() {
        let store = setup_test_store().await;
        store
            .write(Collection::Questions, &json!([{"author": "Amy", "question": "Why?"}]))
            .await
            .unwrap();

        let outcome = store
            .write_if_version(Collection::Questions, &json!([]), 0)
            .await
            .unwrap();
        match outcome {
            WriteOutcome::Conflict(current) => {
                assert_eq!(current.version, 1);
                assert_eq!(
                    current.value,
                    Some(json!([{"author": "Amy", "question": "Why?"}]))
                );
            }
            other => panic!("expected conflict, got {:?}", other),
        }

        let outcome = store
            .write_if_version(Collection::Questions, &json!([]), 1)
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Written(2));
    }

    #[tokio::test]
    async fn test_checked_write_creates_missing_row() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        sqlx::query("DELETE FROM collections")
            .execute(&pool)
            .await
            .unwrap();
        let store = SqliteSharedStore::new(pool, Arc::new(SystemTimeProvider));

        assert_eq!(store.read(Collection::HelpQueue).await.unwrap().value, None);
        let outcome = store
            .write_if_version(Collection::HelpQueue, &json!(["x"]), 0)
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Written(1));
    }

    #[tokio::test]
    async fn test_corrupt_value_is_serialization_error() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        sqlx::query("UPDATE collections SET value = 'not json' WHERE name = 'help_queue'")
            .execute(&pool)
            .await
            .unwrap();
        let store = SqliteSharedStore::new(pool, Arc::new(SystemTimeProvider));

        assert!(matches!(
            store.read(Collection::HelpQueue).await,
            Err(AppError::Serialization(_))
        ));
    }
}

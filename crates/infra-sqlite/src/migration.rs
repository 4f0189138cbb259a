// Migration Runner
//
// Every migration is idempotent, so two clients starting against a fresh
// file at the same time both end up at the latest version.

use crate::store::map_sqlx_error;
use helpdesk_core::error::Result;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Ordered migrations: (version, description, sql)
const MIGRATIONS: &[(i64, &str, &str)] = &[
    (
        1,
        "Initial schema",
        include_str!("../migrations/001_initial_schema.sql"),
    ),
    (
        2,
        "Seed empty collections",
        include_str!("../migrations/002_seed_collections.sql"),
    ),
];

/// Bring the board schema up to date
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current = current_version(pool).await?;
    debug!(current_version = current, "Checked schema version");

    let pending: Vec<_> = MIGRATIONS.iter().filter(|(v, _, _)| *v > current).collect();
    if pending.is_empty() {
        return Ok(());
    }

    for (version, description, sql) in pending {
        info!("Applying migration {:03}: {}", version, description);
        apply_migration(pool, *version, sql).await?;
    }

    Ok(())
}

async fn current_version(pool: &SqlitePool) -> Result<i64> {
    let table_exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
    )
    .fetch_one(pool)
    .await
    .map_err(map_sqlx_error)?;

    if table_exists == 0 {
        return Ok(0);
    }

    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .map_err(map_sqlx_error)?;
    Ok(version.unwrap_or(0))
}

async fn apply_migration(pool: &SqlitePool, version: i64, sql: &str) -> Result<()> {
    let mut tx = pool.begin().await.map_err(map_sqlx_error)?;

    sqlx::raw_sql(sql)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

    sqlx::query(
        "INSERT OR IGNORE INTO schema_version (version, applied_at)
         VALUES (?, CAST(strftime('%s', 'now') AS INTEGER) * 1000)",
    )
    .bind(version)
    .execute(&mut *tx)
    .await
    .map_err(map_sqlx_error)?;

    tx.commit().await.map_err(map_sqlx_error)?;
    Ok(())
}

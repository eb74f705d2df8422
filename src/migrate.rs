use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the schema on an open pool. Idempotent.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // One row per monitored URL; price is NULL when never observed
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prices (
            url TEXT PRIMARY KEY,
            title TEXT NOT NULL DEFAULT '',
            price REAL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_prices_updated_at ON prices(updated_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}

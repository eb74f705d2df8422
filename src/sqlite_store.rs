//! SQLite-backed [`PriceStore`] implementation.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::models::PriceRecord;
use crate::store::PriceStore;

/// SQLite implementation of the [`PriceStore`] trait over the `prices` table.
pub struct SqlitePriceStore {
    pool: SqlitePool,
}

impl SqlitePriceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> PriceRecord {
    PriceRecord {
        url: row.get("url"),
        title: row.get("title"),
        price: row.get("price"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl PriceStore for SqlitePriceStore {
    async fn get(&self, url: &str) -> Result<Option<PriceRecord>> {
        let row = sqlx::query("SELECT url, title, price, updated_at FROM prices WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_record))
    }

    async fn insert(&self, url: &str, title: &str, price: Option<f64>) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("INSERT INTO prices (url, title, price, updated_at) VALUES (?, ?, ?, ?)")
            .bind(url)
            .bind(title)
            .bind(price)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update(&self, url: &str, title: &str, price: Option<f64>) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let result =
            sqlx::query("UPDATE prices SET title = ?, price = ?, updated_at = ? WHERE url = ?")
                .bind(title)
                .bind(price)
                .bind(now)
                .bind(url)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            bail!("no price record for {}", url);
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PriceRecord>> {
        let rows = sqlx::query("SELECT url, title, price, updated_at FROM prices ORDER BY url")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_record).collect())
    }
}

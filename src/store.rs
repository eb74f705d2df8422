//! Storage abstraction for price records.
//!
//! The [`PriceStore`] trait is the narrow key/value seam the ledger writes
//! through. [`SqlitePriceStore`](crate::sqlite_store::SqlitePriceStore) is
//! the durable backend; [`InMemoryPriceStore`] backs tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::PriceRecord;

/// Durable per-URL record storage.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get`](PriceStore::get) | Fetch the record for a URL |
/// | [`insert`](PriceStore::insert) | Create the record for a new URL |
/// | [`update`](PriceStore::update) | Overwrite title and price of an existing URL |
/// | [`list`](PriceStore::list) | All records, ordered by URL |
#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn get(&self, url: &str) -> Result<Option<PriceRecord>>;

    async fn insert(&self, url: &str, title: &str, price: Option<f64>) -> Result<()>;

    async fn update(&self, url: &str, title: &str, price: Option<f64>) -> Result<()>;

    async fn list(&self) -> Result<Vec<PriceRecord>>;
}

/// In-memory store for tests.
#[derive(Default)]
pub struct InMemoryPriceStore {
    records: RwLock<BTreeMap<String, PriceRecord>>,
}

impl InMemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn get(&self, url: &str) -> Result<Option<PriceRecord>> {
        Ok(self.records.read().await.get(url).cloned())
    }

    async fn insert(&self, url: &str, title: &str, price: Option<f64>) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(url) {
            bail!("price record already exists for {}", url);
        }
        records.insert(
            url.to_string(),
            PriceRecord {
                url: url.to_string(),
                title: title.to_string(),
                price,
                updated_at: chrono::Utc::now().timestamp(),
            },
        );
        Ok(())
    }

    async fn update(&self, url: &str, title: &str, price: Option<f64>) -> Result<()> {
        let mut records = self.records.write().await;
        match records.get_mut(url) {
            Some(record) => {
                record.title = title.to_string();
                record.price = price;
                record.updated_at = chrono::Utc::now().timestamp();
                Ok(())
            }
            None => bail!("no price record for {}", url),
        }
    }

    async fn list(&self) -> Result<Vec<PriceRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

//! Price ledger: classify a new observation against stored state, then
//! persist it.
//!
//! The read → classify → write sequence for one URL runs under a per-URL
//! async lock, so two concurrent checks of the same URL cannot both classify
//! against the same stale price. Different URLs never contend.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::models::{ChangeStatus, Classification};
use crate::store::PriceStore;

pub struct PriceLedger {
    store: Arc<dyn PriceStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PriceLedger {
    pub fn new(store: Arc<dyn PriceStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Classify `price` against the stored price for `url` and record it.
    ///
    /// An absent price returns [`ChangeStatus::NotFound`] without touching
    /// storage. A stored `NULL` price counts as `0`, so the next real price
    /// classifies as [`ChangeStatus::Up`].
    pub async fn record_and_classify(
        &self,
        url: &str,
        title: &str,
        price: Option<f64>,
    ) -> Result<Classification> {
        let Some(price) = price else {
            return Ok(Classification {
                status: ChangeStatus::NotFound,
                old_price: None,
            });
        };

        let url_lock = self.lock_for(url).await;
        let result = {
            let _guard = url_lock.lock().await;
            self.classify_and_write(url, title, price).await
        };
        self.release(url, url_lock).await;

        result
    }

    async fn classify_and_write(
        &self,
        url: &str,
        title: &str,
        price: f64,
    ) -> Result<Classification> {
        let Some(prior) = self.store.get(url).await? else {
            self.store.insert(url, title, Some(price)).await?;
            return Ok(Classification {
                status: ChangeStatus::New,
                old_price: None,
            });
        };

        let status = classify(price, prior.price);
        self.store.update(url, title, Some(price)).await?;

        Ok(Classification {
            status,
            old_price: prior.price,
        })
    }

    async fn lock_for(&self, url: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn release(&self, url: &str, url_lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(url_lock);
        // Only the map holds it: nobody is waiting on this URL
        if locks.get(url).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(url);
        }
    }
}

/// Classify `price` against a prior price; `None` counts as `0`.
pub fn classify(price: f64, prior: Option<f64>) -> ChangeStatus {
    let diff = price - prior.unwrap_or(0.0);
    if diff > 0.0 {
        ChangeStatus::Up
    } else if diff < 0.0 {
        ChangeStatus::Down
    } else {
        ChangeStatus::Equal
    }
}

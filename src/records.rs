//! Inspection of stored price records.
//!
//! Backs the `pricewatch list` and `pricewatch get <url>` commands.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::models::PriceRecord;
use crate::sqlite_store::SqlitePriceStore;
use crate::store::PriceStore;

/// CLI entry point: print every stored record.
pub async fn run_list(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db).await?;
    migrate::apply_schema(&pool).await?;
    let store = SqlitePriceStore::new(pool);
    let records = store.list().await?;
    store.pool().close().await;

    if records.is_empty() {
        println!("No price records yet. Run `pricewatch check` first.");
        return Ok(());
    }

    println!("{:>12}  {:<20}  {:<40}  URL", "PRICE", "UPDATED", "TITLE");
    for rec in &records {
        println!(
            "{:>12}  {:<20}  {:<40}  {}",
            rec.price.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            format_ts_iso(rec.updated_at),
            truncate(&rec.title, 40),
            rec.url
        );
    }
    println!("{} record(s)", records.len());

    Ok(())
}

/// CLI entry point: print the record for one URL.
pub async fn run_get(config: &Config, url: &str) -> Result<()> {
    let pool = db::connect(&config.db).await?;
    migrate::apply_schema(&pool).await?;
    let store = SqlitePriceStore::new(pool);
    let record = store.get(url).await;
    store.pool().close().await;

    let Some(rec) = record? else {
        bail!("no price record for {}", url);
    };
    print_record(&rec);
    Ok(())
}

fn print_record(rec: &PriceRecord) {
    println!("url:        {}", rec.url);
    println!("title:      {}", rec.title);
    println!(
        "price:      {}",
        rec.price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!("updated_at: {}", format_ts_iso(rec.updated_at));
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

//! Price check pipeline orchestration.
//!
//! Coordinates one run per target: fetch → extract → classify → notify.
//! Every failure degrades to a [`CheckResult`]; nothing here returns an
//! error for a single target.

use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::db;
use crate::egress::EgressRotator;
use crate::fetch::Fetcher;
use crate::ledger::PriceLedger;
use crate::migrate;
use crate::models::CheckResult;
use crate::notify::{self, Notifier};
use crate::sqlite_store::SqlitePriceStore;
use crate::store::PriceStore;
use crate::transport::{HttpTransport, ReqwestTransport};

pub struct PriceChecker {
    fetcher: Fetcher,
    ledger: PriceLedger,
    notifier: Notifier,
}

impl PriceChecker {
    pub fn new(fetcher: Fetcher, ledger: PriceLedger, notifier: Notifier) -> Self {
        Self {
            fetcher,
            ledger,
            notifier,
        }
    }

    /// Wire a checker from configuration around the given store.
    pub fn from_config(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn PriceStore>,
        max_attempts: Option<u32>,
    ) -> Self {
        let egress = Arc::new(EgressRotator::new(config.fetch.proxies.clone()));
        let fetcher = Fetcher::new(
            transport.clone(),
            egress,
            max_attempts.unwrap_or(config.fetch.max_attempts),
            config.fetch.user_agent.clone(),
        );
        let notifier = Notifier::new(transport, config.telegram.clone());
        Self::new(fetcher, PriceLedger::new(store), notifier)
    }

    /// Run the full pipeline for one target URL.
    pub async fn run_price_check(&self, target: &str) -> CheckResult {
        let fetched = self.fetcher.fetch(target).await;
        let Some(item) = fetched.item.filter(|_| fetched.success) else {
            tracing::warn!(
                url = target,
                attempts = fetched.attempts,
                error = fetched.last_error.as_deref().unwrap_or("unknown"),
                "fetch failed"
            );
            return CheckResult::failed(target);
        };

        let classification = match self
            .ledger
            .record_and_classify(target, &item.title, item.price)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(url = target, error = %e, "failed to record price");
                return CheckResult {
                    title: Some(item.title),
                    price: item.price,
                    ..CheckResult::failed(target)
                };
            }
        };

        tracing::info!(
            url = target,
            status = %classification.status,
            price = ?item.price,
            old_price = ?classification.old_price,
            "price classified"
        );

        let notified = match item.price.and_then(|price| {
            notify::format_change_message(target, &item.title, &classification, price)
        }) {
            Some(message) => Some(self.notifier.notify(&message).await.delivered),
            None => None,
        };

        CheckResult {
            url: target.to_string(),
            success: true,
            title: Some(item.title),
            price: item.price,
            old_price: classification.old_price,
            status: Some(classification.status),
            notified,
        }
    }

    /// Check every target with at most `concurrency` runs in flight.
    /// Results come back in input order.
    pub async fn run_all(
        self: Arc<Self>,
        targets: Vec<String>,
        concurrency: usize,
    ) -> Vec<CheckResult> {
        let permits = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut set = JoinSet::new();

        for (idx, target) in targets.iter().cloned().enumerate() {
            let checker = self.clone();
            let permits = permits.clone();
            set.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (idx, checker.run_price_check(&target).await)
            });
        }

        let mut results: Vec<Option<CheckResult>> = vec![None; targets.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, result)) => results[idx] = Some(result),
                Err(e) => tracing::error!(error = %e, "price check task failed"),
            }
        }

        results
            .into_iter()
            .zip(targets)
            .map(|(r, t)| r.unwrap_or_else(|| CheckResult::failed(&t)))
            .collect()
    }
}

/// Output format for `pricewatch check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => bail!("Unknown format: '{}'. Must be table, csv, or json.", other),
        }
    }
}

pub async fn run_check(
    config: &Config,
    urls: Vec<String>,
    format: OutputFormat,
    max_attempts: Option<u32>,
) -> Result<()> {
    let targets = if urls.is_empty() {
        config.targets.urls.clone()
    } else {
        urls
    };
    if targets.is_empty() {
        bail!("No targets: pass URLs or set [targets].urls in the config file");
    }
    if max_attempts == Some(0) {
        bail!("--attempts must be >= 1");
    }

    let pool = db::connect(&config.db).await?;
    migrate::apply_schema(&pool).await?;
    let store: Arc<dyn PriceStore> = Arc::new(SqlitePriceStore::new(pool.clone()));
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(
        config.fetch.timeout_secs,
        &config.fetch.proxies,
    )?);

    let checker = Arc::new(PriceChecker::from_config(
        config,
        transport,
        store,
        max_attempts,
    ));
    let results = checker.run_all(targets, config.fetch.concurrency).await;

    print!("{}", render(&results, format)?);

    pool.close().await;
    Ok(())
}

pub fn render(results: &[CheckResult], format: OutputFormat) -> Result<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Json => {
            out.push_str(&serde_json::to_string_pretty(results)?);
            out.push('\n');
        }
        OutputFormat::Csv => {
            out.push_str("url,title,status,price,old_price\n");
            for r in results {
                let fields = [
                    r.url.clone(),
                    r.title.clone().unwrap_or_default(),
                    status_label(r),
                    fmt_price(r.price),
                    fmt_price(r.old_price),
                ];
                let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
                out.push_str(&line.join(","));
                out.push('\n');
            }
        }
        OutputFormat::Table => {
            out.push_str(&format!(
                "{:<10} {:>12} {:>12}  {:<8} URL\n",
                "STATUS", "PRICE", "OLD PRICE", "NOTIFIED"
            ));
            for r in results {
                let notified = match r.notified {
                    Some(true) => "yes",
                    Some(false) => "failed",
                    None => "-",
                };
                out.push_str(&format!(
                    "{:<10} {:>12} {:>12}  {:<8} {}\n",
                    status_label(r),
                    fmt_price(r.price),
                    fmt_price(r.old_price),
                    notified,
                    r.url
                ));
            }
        }
    }
    Ok(out)
}

fn status_label(r: &CheckResult) -> String {
    match (r.success, r.status) {
        (true, Some(status)) => status.to_string(),
        _ => "failed".to_string(),
    }
}

fn fmt_price(price: Option<f64>) -> String {
    price.map(|p| p.to_string()).unwrap_or_default()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeStatus;

    fn sample() -> Vec<CheckResult> {
        vec![
            CheckResult {
                url: "https://rozetka.com.ua/a/".to_string(),
                success: true,
                title: Some("Kettle, \"steel\"".to_string()),
                price: Some(120.0),
                old_price: Some(100.0),
                status: Some(ChangeStatus::Up),
                notified: Some(true),
            },
            CheckResult::failed("https://mvideo.ru/b"),
        ]
    }

    #[test]
    fn test_csv_quotes_and_failed_rows() {
        let csv = render(&sample(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "url,title,status,price,old_price");
        assert_eq!(
            lines[1],
            "https://rozetka.com.ua/a/,\"Kettle, \"\"steel\"\"\",up,120,100"
        );
        assert_eq!(lines[2], "https://mvideo.ru/b,,failed,,");
    }

    #[test]
    fn test_json_output_is_parseable() {
        let json = render(&sample(), OutputFormat::Json).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v[0]["status"], "up");
        assert_eq!(v[1]["success"], false);
    }

    #[test]
    fn test_table_marks_notification_state() {
        let table = render(&sample(), OutputFormat::Table).unwrap();
        assert!(table.lines().nth(1).unwrap().contains("yes"));
        assert!(table.lines().nth(2).unwrap().starts_with("failed"));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}

//! # Price Watch
//!
//! Fetches product pages, extracts the current title and price with a
//! site-specific rule, compares the price against the last recorded one and
//! sends a Telegram message when it moved.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌────────────┐
//! │  Fetcher   │──▶│ Extraction │──▶│   Ledger   │──▶│  Notifier  │
//! │ retry+proxy│◀──│  registry  │   │  SQLite    │   │  Telegram  │
//! └────────────┘   └────────────┘   └────────────┘   └────────────┘
//!   rotate egress on content mismatch     notify only on up / down
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pricewatch init                          # create database
//! pricewatch sites                         # list supported shops
//! pricewatch check https://rozetka.com.ua/...
//! pricewatch check --format csv            # all [targets].urls
//! pricewatch list                          # stored prices
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Pipeline data types |
//! | [`extract`] | Per-site extraction rules |
//! | [`transport`] | HTTP transport trait and reqwest implementation |
//! | [`egress`] | Proxy rotation state |
//! | [`fetch`] | Retrying fetch loop |
//! | [`store`] | Price record storage trait, in-memory backend |
//! | [`sqlite_store`] | SQLite storage backend |
//! | [`ledger`] | Change classification with per-URL serialization |
//! | [`notify`] | Telegram notifier |
//! | [`check`] | Pipeline orchestration and output rendering |
//! | [`records`] | Stored record inspection |
//! | [`sites`] | Registered site listing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod check;
pub mod config;
pub mod db;
pub mod egress;
pub mod extract;
pub mod fetch;
pub mod ledger;
pub mod migrate;
pub mod models;
pub mod notify;
pub mod records;
pub mod sites;
pub mod sqlite_store;
pub mod store;
pub mod transport;

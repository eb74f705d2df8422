//! End-to-end tests of the price check pipeline.
//!
//! The network is replaced by a scripted [`HttpTransport`] that serves
//! product pages for GETs and Bot API replies for POSTs, so every scenario
//! runs offline against the real fetcher, ledger and notifier.

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use price_watch::check::PriceChecker;
use price_watch::config::{FetchConfig, TelegramConfig};
use price_watch::egress::EgressRotator;
use price_watch::fetch::Fetcher;
use price_watch::ledger::PriceLedger;
use price_watch::models::ChangeStatus;
use price_watch::notify::Notifier;
use price_watch::store::{InMemoryPriceStore, PriceStore};
use price_watch::transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use tokio::sync::Mutex;

const URL: &str = "https://rozetka.com.ua/kettle/p100/";

fn rozetka_page(title: &str, price: &str) -> String {
    format!(
        r#"<html><head><meta property="og:title" content="{}"><meta itemprop="price" content="{}"></head>
        <body><ul><li class="nav-tabs-i">Все о товаре</li></ul></body></html>"#,
        title, price
    )
}

// ─── Fake transport ─────────────────────────────────────────────────

enum Reply {
    Page(String),
    Fail,
}

/// Serves queued page replies for GETs and a fixed Bot API body for POSTs.
struct FakeNet {
    pages: Mutex<VecDeque<Reply>>,
    telegram_reply: String,
    gets: Mutex<Vec<HttpRequest>>,
    posts: Mutex<Vec<HttpRequest>>,
}

impl FakeNet {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(VecDeque::new()),
            telegram_reply: r#"{"ok":true,"result":{}}"#.to_string(),
            gets: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
        })
    }

    async fn queue(&self, reply: Reply) {
        self.pages.lock().await.push_back(reply);
    }

    async fn queue_page(&self, title: &str, price: &str) {
        self.queue(Reply::Page(rozetka_page(title, price))).await;
    }
}

#[async_trait]
impl HttpTransport for FakeNet {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        match request.method {
            Method::Post => {
                self.posts.lock().await.push(request);
                Ok(HttpResponse {
                    status: 200,
                    body: self.telegram_reply.clone(),
                })
            }
            Method::Get => {
                self.gets.lock().await.push(request);
                match self.pages.lock().await.pop_front() {
                    Some(Reply::Page(body)) => Ok(HttpResponse { status: 200, body }),
                    Some(Reply::Fail) | None => bail!("connection refused"),
                }
            }
        }
    }
}

// ─── Harness ────────────────────────────────────────────────────────

struct Harness {
    net: Arc<FakeNet>,
    egress: Arc<EgressRotator>,
    store: Arc<InMemoryPriceStore>,
    checker: PriceChecker,
}

fn telegram() -> TelegramConfig {
    TelegramConfig {
        token: Some("123:abc".to_string()),
        chat_id: Some("42".to_string()),
        api_base: "https://api.telegram.test".to_string(),
    }
}

fn harness_with(net: Arc<FakeNet>, tg: TelegramConfig, max_attempts: u32) -> Harness {
    let egress = Arc::new(EgressRotator::direct());
    let store = Arc::new(InMemoryPriceStore::new());
    let fetcher = Fetcher::new(
        net.clone(),
        egress.clone(),
        max_attempts,
        FetchConfig::default().user_agent,
    );
    let checker = PriceChecker::new(
        fetcher,
        PriceLedger::new(store.clone()),
        Notifier::new(net.clone(), tg),
    );
    Harness {
        net,
        egress,
        store,
        checker,
    }
}

fn harness() -> Harness {
    harness_with(FakeNet::new(), telegram(), 3)
}

// ─── Scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_first_check_is_new_and_silent() {
    let h = harness();
    h.net.queue_page("Kettle", "100").await;

    let result = h.checker.run_price_check(URL).await;

    assert!(result.success);
    assert_eq!(result.status, Some(ChangeStatus::New));
    assert_eq!(result.price, Some(100.0));
    assert_eq!(result.old_price, None);
    assert_eq!(result.notified, None);
    assert!(h.net.posts.lock().await.is_empty());

    let rec = h.store.get(URL).await.unwrap().unwrap();
    assert_eq!(rec.price, Some(100.0));
    assert_eq!(rec.title, "Kettle");
}

#[tokio::test]
async fn test_second_check_up_notifies_increase() {
    let h = harness();
    h.net.queue_page("Kettle", "100").await;
    h.net.queue_page("Kettle", "120").await;

    h.checker.run_price_check(URL).await;
    let result = h.checker.run_price_check(URL).await;

    assert_eq!(result.status, Some(ChangeStatus::Up));
    assert_eq!(result.old_price, Some(100.0));
    assert_eq!(result.notified, Some(true));
    assert_eq!(
        h.store.get(URL).await.unwrap().unwrap().price,
        Some(120.0)
    );

    let posts = h.net.posts.lock().await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].url, "https://api.telegram.test/bot123:abc/sendMessage");
    assert_eq!(posts[0].proxy, None);
    let body = posts[0].body.as_ref().unwrap();
    assert_eq!(body["chat_id"], "42");
    assert_eq!(body["parse_mode"], "HTML");
    assert_eq!(body["disable_web_page_preview"], true);
    assert!(body["text"].as_str().unwrap().contains("went up"));
}

#[tokio::test]
async fn test_price_drop_notifies_decrease() {
    let h = harness();
    h.net.queue_page("Kettle", "100").await;
    h.net.queue_page("Kettle", "75.5").await;

    h.checker.run_price_check(URL).await;
    let result = h.checker.run_price_check(URL).await;

    assert_eq!(result.status, Some(ChangeStatus::Down));
    let posts = h.net.posts.lock().await;
    assert!(posts[0].body.as_ref().unwrap()["text"]
        .as_str()
        .unwrap()
        .contains("went down"));
}

#[tokio::test]
async fn test_equal_price_does_not_notify() {
    let h = harness();
    h.net.queue_page("Kettle", "100").await;
    h.net.queue_page("Kettle", "100").await;

    h.checker.run_price_check(URL).await;
    let result = h.checker.run_price_check(URL).await;

    assert_eq!(result.status, Some(ChangeStatus::Equal));
    assert_eq!(result.notified, None);
    assert!(h.net.posts.lock().await.is_empty());
}

#[tokio::test]
async fn test_total_mismatch_leaves_record_unchanged() {
    let h = harness();
    h.net.queue_page("Kettle", "100").await;
    h.net.queue_page("Kettle", "120").await;
    h.checker.run_price_check(URL).await;
    h.checker.run_price_check(URL).await;
    let rotations_before = h.egress.rotations();

    for _ in 0..3 {
        h.net.queue(Reply::Page("<html>Access denied</html>".to_string())).await;
    }
    let result = h.checker.run_price_check(URL).await;

    assert!(!result.success);
    assert_eq!(result.status, None);
    assert_eq!(h.egress.rotations() - rotations_before, 3);
    assert_eq!(h.net.gets.lock().await.len(), 5);
    assert_eq!(
        h.store.get(URL).await.unwrap().unwrap().price,
        Some(120.0)
    );
}

#[tokio::test]
async fn test_transport_failures_then_success() {
    let h = harness();
    h.net.queue(Reply::Fail).await;
    h.net.queue(Reply::Fail).await;
    h.net.queue_page("Kettle", "100").await;

    let result = h.checker.run_price_check(URL).await;

    assert!(result.success);
    assert_eq!(h.egress.rotations(), 0);
    assert_eq!(h.net.gets.lock().await.len(), 3);
}

#[tokio::test]
async fn test_missing_price_is_not_found_and_keeps_record() {
    let h = harness();
    h.net.queue_page("Kettle", "100").await;
    h.net.queue_page("Kettle (sold out)", "нет в наличии").await;

    h.checker.run_price_check(URL).await;
    let result = h.checker.run_price_check(URL).await;

    assert!(result.success);
    assert_eq!(result.status, Some(ChangeStatus::NotFound));
    assert_eq!(result.notified, None);
    let rec = h.store.get(URL).await.unwrap().unwrap();
    assert_eq!(rec.price, Some(100.0));
    assert_eq!(rec.title, "Kettle");
}

#[tokio::test]
async fn test_unknown_site_fails_without_rotation() {
    let h = harness();
    h.net.queue_page("Kettle", "100").await;
    h.net.queue_page("Kettle", "100").await;

    let result = h.checker.run_price_check("https://shop.example.org/p/1").await;

    assert!(!result.success);
    assert_eq!(h.egress.rotations(), 0);
    assert_eq!(h.net.gets.lock().await.len(), 1);
    assert!(h.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_credentials_skip_network_but_check_succeeds() {
    let tg = TelegramConfig {
        token: None,
        ..telegram()
    };
    let h = harness_with(FakeNet::new(), tg, 3);
    h.net.queue_page("Kettle", "100").await;
    h.net.queue_page("Kettle", "150").await;

    h.checker.run_price_check(URL).await;
    let result = h.checker.run_price_check(URL).await;

    assert!(result.success);
    assert_eq!(result.status, Some(ChangeStatus::Up));
    assert_eq!(result.notified, Some(false));
    assert!(h.net.posts.lock().await.is_empty());
}

#[tokio::test]
async fn test_rejected_notification_does_not_fail_check() {
    let net = Arc::new(FakeNet {
        telegram_reply: r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#
            .to_string(),
        pages: Mutex::new(VecDeque::new()),
        gets: Mutex::new(Vec::new()),
        posts: Mutex::new(Vec::new()),
    });
    let h = harness_with(net, telegram(), 3);
    h.net.queue_page("Kettle", "100").await;
    h.net.queue_page("Kettle", "90").await;

    h.checker.run_price_check(URL).await;
    let result = h.checker.run_price_check(URL).await;

    assert!(result.success);
    assert_eq!(result.status, Some(ChangeStatus::Down));
    assert_eq!(result.notified, Some(false));
    assert_eq!(h.net.posts.lock().await.len(), 1);
}

#[tokio::test]
async fn test_notifier_without_token_makes_no_call() {
    let net = FakeNet::new();
    let notifier = Notifier::new(
        net.clone(),
        TelegramConfig {
            token: None,
            chat_id: None,
            ..telegram()
        },
    );

    let result = notifier.notify("hello").await;

    assert!(!result.delivered);
    assert_eq!(result.diagnostic.as_deref(), Some("missing credentials"));
    assert!(net.posts.lock().await.is_empty());
}

#[tokio::test]
async fn test_notifier_with_blank_chat_id_makes_no_call() {
    let net = FakeNet::new();
    let notifier = Notifier::new(
        net.clone(),
        TelegramConfig {
            chat_id: Some("   ".to_string()),
            ..telegram()
        },
    );

    let result = notifier.notify("hello").await;

    assert!(!result.delivered);
    assert_eq!(result.diagnostic.as_deref(), Some("missing credentials"));
    assert!(net.posts.lock().await.is_empty());
}

#[tokio::test]
async fn test_run_all_keeps_input_order() {
    let h = harness();
    h.net.queue_page("A", "1").await;
    h.net.queue_page("B", "2").await;

    let checker = Arc::new(h.checker);
    let results = checker
        .run_all(
            vec![
                "https://rozetka.com.ua/a/".to_string(),
                "https://rozetka.com.ua/b/".to_string(),
            ],
            1,
        )
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].url, "https://rozetka.com.ua/a/");
    assert_eq!(results[1].url, "https://rozetka.com.ua/b/");
    assert!(results.iter().all(|r| r.status == Some(ChangeStatus::New)));
}

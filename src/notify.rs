//! Telegram notifications for price changes.
//!
//! Delivery is a single best-effort `sendMessage` call. Failures are
//! returned as a [`NotificationResult`] and logged; they never propagate as
//! errors.
//!
//! Response handling:
//! - 200, 400 and 401 are real Bot API replies and are parsed
//! - anything else (or no response at all) is a transport failure
//! - a parsed reply is delivered only if it says `"ok": true`

use std::sync::Arc;

use anyhow::{bail, Result};
use serde_json::{json, Value};

use crate::config::{Config, TelegramConfig};
use crate::models::{ChangeStatus, Classification, NotificationResult};
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};

/// Statuses on which the Bot API still returns a JSON body worth reading.
const PARSEABLE_STATUSES: &[u16] = &[200, 400, 401];

pub struct Notifier {
    transport: Arc<dyn HttpTransport>,
    config: TelegramConfig,
}

impl Notifier {
    pub fn new(transport: Arc<dyn HttpTransport>, config: TelegramConfig) -> Self {
        Self { transport, config }
    }

    /// Send `text` (Telegram HTML markup) to the configured chat.
    pub async fn notify(&self, text: &str) -> NotificationResult {
        let Some((token, chat_id)) = self.config.credentials() else {
            tracing::warn!("telegram token or chat id not configured, skipping notification");
            return NotificationResult::failed("missing credentials");
        };

        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            token
        );
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        let request = HttpRequest {
            accepted_statuses: PARSEABLE_STATUSES.to_vec(),
            ..HttpRequest::post_json(&url, body)
        };

        let response = match self.transport.execute(request).await {
            Ok(r) => r,
            Err(e) => {
                // The error text may embed the URL, which carries the token
                tracing::warn!(error = %redact(&e.to_string(), token), "sending failed");
                return NotificationResult::failed("sending failed");
            }
        };

        let result = interpret_response(&response.body);
        match (result.delivered, result.diagnostic.as_deref()) {
            (true, _) => tracing::info!(chat_id, "notification delivered"),
            (false, Some(d)) => tracing::warn!(chat_id, "notification rejected: {}", d),
            (false, None) => tracing::warn!(chat_id, "notification reply was not valid JSON"),
        }
        result
    }
}

/// CLI entry point: send one message and report the outcome.
pub async fn run_notify(config: &Config, text: &str) -> Result<()> {
    let transport = Arc::new(ReqwestTransport::new(config.fetch.timeout_secs, &[])?);
    let notifier = Notifier::new(transport, config.telegram.clone());

    let result = notifier.notify(text).await;
    if !result.delivered {
        bail!(
            "notification not delivered: {}",
            result.diagnostic.as_deref().unwrap_or("no diagnostic")
        );
    }
    println!("delivered");
    Ok(())
}

/// Interpret a Bot API reply body.
pub fn interpret_response(body: &str) -> NotificationResult {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return NotificationResult::default();
    };

    if json.get("ok").and_then(Value::as_bool) == Some(true) {
        return NotificationResult {
            delivered: true,
            diagnostic: None,
        };
    }

    NotificationResult {
        delivered: false,
        diagnostic: json
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

/// Build the message for a price movement. Returns `None` for statuses that
/// do not warrant a notification.
pub fn format_change_message(
    url: &str,
    title: &str,
    classification: &Classification,
    price: f64,
) -> Option<String> {
    let verb = match classification.status {
        ChangeStatus::Up => "went up",
        ChangeStatus::Down => "went down",
        _ => return None,
    };

    let name = if title.is_empty() { url } else { title };
    let old = classification
        .old_price
        .map(format_price)
        .unwrap_or_else(|| "unknown".to_string());

    Some(format!(
        "Price for <a href=\"{}\">{}</a> <b>{}</b>: {} → {}",
        escape_html(url),
        escape_html(name),
        verb,
        old,
        format_price(price)
    ))
}

fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{:.0}", price)
    } else {
        format!("{:.2}", price)
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn redact(text: &str, secret: &str) -> String {
    text.replace(secret, "***")
}

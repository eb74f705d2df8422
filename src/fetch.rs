//! Resilient product page fetcher.
//!
//! Runs up to `max_attempts` GETs against a target and stops at the first
//! response whose content passes extraction.
//!
//! Per attempt:
//! - transport failure → next attempt, no rotation
//! - content mismatch → rotate egress once, next attempt
//! - unknown site → stop, no rotation (retrying cannot help)
//! - extracted → stop, success
//!
//! The returned outcome describes the last attempt made.

use std::sync::Arc;

use crate::egress::EgressRotator;
use crate::extract::{self, ExtractError};
use crate::models::FetchOutcome;
use crate::transport::{HttpRequest, HttpTransport};

pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    egress: Arc<EgressRotator>,
    max_attempts: u32,
    user_agent: String,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        egress: Arc<EgressRotator>,
        max_attempts: u32,
        user_agent: String,
    ) -> Self {
        Self {
            transport,
            egress,
            max_attempts,
            user_agent,
        }
    }

    fn browser_headers(&self) -> Vec<(String, String)> {
        vec![
            ("user-agent".to_string(), self.user_agent.clone()),
            (
                "accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ),
            (
                "accept-language".to_string(),
                "ru-RU,ru;q=0.9,uk;q=0.8,en;q=0.7".to_string(),
            ),
        ]
    }

    /// Fetch `url` and extract its title and price.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let site = extract::site_id_for_url(url).unwrap_or_default();
        let mut outcome = FetchOutcome::default();

        for attempt in 1..=self.max_attempts {
            outcome = FetchOutcome {
                attempts: attempt,
                ..FetchOutcome::default()
            };

            let request = HttpRequest {
                attempt,
                headers: self.browser_headers(),
                proxy: self.egress.current().map(str::to_string),
                ..HttpRequest::get(url)
            };

            tracing::debug!(url, attempt, proxy = ?request.proxy, "fetching");

            let response = match self.transport.execute(request).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(url, attempt, error = %e, "request failed");
                    outcome.last_error = Some(e.to_string());
                    continue;
                }
            };

            match extract::extract(&site, &response.body) {
                Ok(item) => {
                    outcome.success = true;
                    outcome.item = Some(item);
                    outcome.raw_content = Some(response.body);
                    break;
                }
                Err(ExtractError::ContentMismatch) => {
                    tracing::warn!(url, attempt, "content mismatch, rotating egress");
                    outcome.last_error = Some(ExtractError::ContentMismatch.to_string());
                    outcome.raw_content = Some(response.body);
                    self.egress.rotate();
                }
                Err(e @ ExtractError::UnknownSite(_)) => {
                    tracing::error!(url, "{}", e);
                    outcome.last_error = Some(e.to_string());
                    outcome.raw_content = Some(response.body);
                    break;
                }
            }
        }

        outcome
    }
}

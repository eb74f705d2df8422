//! HTTP transport abstraction.
//!
//! The pipeline never talks to reqwest directly. It builds an [`HttpRequest`]
//! and hands it to an [`HttpTransport`], which either yields a usable
//! [`HttpResponse`] or an error meaning "no usable response". Tests swap in a
//! scripted transport.
//!
//! [`ReqwestTransport`] is the production implementation:
//! - one pre-built client per configured proxy plus a direct client
//! - gzip / brotli / deflate and charset decoding handled by reqwest
//! - a response counts only if its status is in `accepted_statuses`

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One network call, with attempt-scoped metadata.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// JSON body, sent with `Content-Type: application/json`.
    pub body: Option<serde_json::Value>,
    /// 1-based attempt number, for logging.
    pub attempt: u32,
    pub headers: Vec<(String, String)>,
    /// Proxy URL to route through; `None` connects directly.
    pub proxy: Option<String>,
    /// Statuses treated as a real response. Empty means any 2xx.
    pub accepted_statuses: Vec<u16>,
}

impl HttpRequest {
    pub fn get(url: &str) -> Self {
        Self {
            method: Method::Get,
            url: url.to_string(),
            body: None,
            attempt: 1,
            headers: Vec::new(),
            proxy: None,
            accepted_statuses: vec![200],
        }
    }

    pub fn post_json(url: &str, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(url)
        }
    }

    pub fn accepts(&self, status: u16) -> bool {
        if self.accepted_statuses.is_empty() {
            (200..300).contains(&status)
        } else {
            self.accepted_statuses.contains(&status)
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Executes a single HTTP request.
///
/// `Err` means no usable response was obtained (connect error, timeout,
/// or a status outside [`HttpRequest::accepted_statuses`]).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`HttpTransport`] backed by reqwest.
pub struct ReqwestTransport {
    direct: reqwest::Client,
    proxied: HashMap<String, reqwest::Client>,
}

impl ReqwestTransport {
    /// Build clients for a direct route and for every proxy in `proxies`.
    pub fn new(timeout_secs: u64, proxies: &[String]) -> Result<Self> {
        let direct = Self::builder(timeout_secs).build()?;

        let mut proxied = HashMap::new();
        for proxy in proxies {
            let client = Self::builder(timeout_secs)
                .proxy(reqwest::Proxy::all(proxy.as_str())?)
                .build()?;
            proxied.insert(proxy.clone(), client);
        }

        Ok(Self { direct, proxied })
    }

    fn builder(timeout_secs: u64) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .gzip(true)
            .brotli(true)
            .deflate(true)
    }

    fn client_for(&self, proxy: Option<&str>) -> Result<&reqwest::Client> {
        match proxy {
            None => Ok(&self.direct),
            Some(p) => self
                .proxied
                .get(p)
                .ok_or_else(|| anyhow!("proxy not configured: {}", p)),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let client = self.client_for(request.proxy.as_deref())?;

        let mut builder = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();

        if !request.accepts(status) {
            bail!("HTTP {} from {}", status, request.url);
        }

        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

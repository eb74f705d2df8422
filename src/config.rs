use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub targets: TargetsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Outbound proxies rotated on content mismatch. Empty means direct only.
    #[serde(default)]
    pub proxies: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            user_agent: default_user_agent(),
            proxies: Vec::new(),
        }
    }
}

fn default_max_attempts() -> u32 {
    10
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_concurrency() -> usize {
    4
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/79.0.3945.88 Safari/537.36"
        .to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            chat_id: None,
            api_base: default_api_base(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

impl TelegramConfig {
    /// Fill missing credentials from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`.
    pub fn with_env_fallback(mut self) -> Self {
        if self.token.is_none() {
            self.token = std::env::var("TELEGRAM_BOT_TOKEN").ok();
        }
        if self.chat_id.is_none() {
            self.chat_id = std::env::var("TELEGRAM_CHAT_ID").ok();
        }
        self
    }

    /// Token and chat id, when both are set and non-blank.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let set: fn(&Option<String>) -> Option<&str> = |v| v.as_deref().filter(|s| !s.trim().is_empty());
        Some((set(&self.token)?, set(&self.chat_id)?))
    }

}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TargetsConfig {
    #[serde(default)]
    pub urls: Vec<String>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    config.telegram = config.telegram.with_env_fallback();
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.fetch.max_attempts == 0 {
        anyhow::bail!("fetch.max_attempts must be >= 1");
    }

    if config.fetch.concurrency == 0 {
        anyhow::bail!("fetch.concurrency must be >= 1");
    }

    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be >= 1");
    }

    for proxy in &config.fetch.proxies {
        reqwest::Url::parse(proxy)
            .with_context(|| format!("fetch.proxies: invalid proxy URL '{}'", proxy))?;
    }

    for url in &config.targets.urls {
        reqwest::Url::parse(url)
            .with_context(|| format!("targets.urls: invalid URL '{}'", url))?;
    }

    Ok(())
}

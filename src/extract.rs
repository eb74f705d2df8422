//! Site-specific extraction of title and price from product pages.
//!
//! Each supported shop is a [`SiteRule`]: a presence marker plus two
//! patterns. Rules are plain data in a static table keyed by registrable
//! domain, so adding a shop means adding one entry to [`RULES`].
//!
//! Extraction is pure: the same page content always yields the same result.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::ExtractedItem;

/// Extraction error. Both variants are reported as a failed attempt by the
/// fetcher; only [`ExtractError::ContentMismatch`] triggers egress rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The page lacks the rule's presence marker (wrong or changed layout).
    ContentMismatch,
    /// No rule is registered for this site.
    UnknownSite(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::ContentMismatch => write!(f, "content mismatch"),
            ExtractError::UnknownSite(site) => write!(f, "unknown site: {}", site),
        }
    }
}

impl std::error::Error for ExtractError {}

static RE_MVIDEO_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<h1[^>]*class="[^"]*\btitle\b[^"]*"[^>]*>\s*([^<]+?)\s*</h1>"#).unwrap()
});
static RE_MVIDEO_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span[^>]*class="[^"]*\bprice__main-value\b[^"]*"[^>]*>\s*([^<]+?)\s*</span>"#)
        .unwrap()
});
static RE_ROZETKA_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<meta property="og:title" content="([^"]+)""#).unwrap());
static RE_ROZETKA_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<meta itemprop="price" content="([^"]+)""#).unwrap());
static RE_LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d[\d.,]*").unwrap());

/// Extraction rule for one shop.
pub struct SiteRule {
    /// Registrable domain the rule is keyed by.
    pub site: &'static str,
    /// Substring that must appear in a genuine product page.
    pub marker: &'static str,
    title: &'static LazyLock<Regex>,
    price: &'static LazyLock<Regex>,
}

impl SiteRule {
    fn apply(&self, raw: &str) -> Result<ExtractedItem, ExtractError> {
        if !raw.contains(self.marker) {
            return Err(ExtractError::ContentMismatch);
        }

        let price = capture_first(self.price, raw).and_then(|s| parse_price(&s));
        let title = capture_first(self.title, raw)
            .map(|s| decode_entities(&s).trim().to_string())
            .unwrap_or_default();

        Ok(ExtractedItem { title, price })
    }
}

/// Registered shops.
pub static RULES: &[SiteRule] = &[
    SiteRule {
        site: "mvideo.ru",
        marker: r#"class="layout__content""#,
        title: &RE_MVIDEO_TITLE,
        price: &RE_MVIDEO_PRICE,
    },
    SiteRule {
        site: "rozetka.com.ua",
        marker: r#"class="nav-tabs-i""#,
        title: &RE_ROZETKA_TITLE,
        price: &RE_ROZETKA_PRICE,
    },
];

/// Public suffixes that span two labels. A host under one of these keeps
/// three labels in its registrable domain.
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    "com.ua", "org.ua", "net.ua", "kiev.ua", "co.uk", "org.uk", "com.ru", "com.au", "co.jp",
    "com.br", "com.tr", "co.il", "com.pl", "com.kz",
];

/// Extract title and price from `raw` using the rule registered for `site`.
pub fn extract(site: &str, raw: &str) -> Result<ExtractedItem, ExtractError> {
    match find_rule(site) {
        Some(rule) => rule.apply(raw),
        None => Err(ExtractError::UnknownSite(site.to_string())),
    }
}

pub fn find_rule(site: &str) -> Option<&'static SiteRule> {
    RULES.iter().find(|r| r.site == site)
}

pub fn registered_sites() -> impl Iterator<Item = &'static SiteRule> {
    RULES.iter()
}

/// Registrable domain of a URL (`https://www.mvideo.ru/p/1` → `mvideo.ru`).
///
/// Returns `None` for unparsable URLs or URLs without a host.
pub fn site_id_for_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?.trim_end_matches('.').to_ascii_lowercase();

    if host.parse::<std::net::IpAddr>().is_ok() || host.starts_with('[') {
        return Some(host);
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return Some(labels.join("."));
    }

    let last_two = labels[labels.len() - 2..].join(".");
    let keep = if MULTI_LABEL_SUFFIXES.contains(&last_two.as_str()) {
        3
    } else {
        2
    };
    Some(labels[labels.len() - keep..].join("."))
}

fn capture_first(re: &Regex, raw: &str) -> Option<String> {
    re.captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse a shop-formatted price such as `"12 990 ₽"`, `"1299,50"`,
/// `"1,299.00"` or `"1.299,00 €"`. Reads the leading number and ignores any
/// currency suffix.
///
/// With both `.` and `,` present the last one is the decimal point. With a
/// single kind of separator, it groups thousands when it repeats or when
/// exactly three digits follow it; otherwise it is the decimal point.
pub fn parse_price(text: &str) -> Option<f64> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{00a0}' && *c != '\u{202f}')
        .collect();

    let number = RE_LEADING_NUMBER
        .find(&compact)?
        .as_str()
        .trim_end_matches(['.', ',']);

    let normalized = match (number.rfind('.'), number.rfind(',')) {
        (Some(dot), Some(comma)) => {
            let (decimal, group) = if dot > comma { ('.', ',') } else { (',', '.') };
            number.replace(group, "").replace(decimal, ".")
        }
        (Some(pos), None) | (None, Some(pos)) => {
            let sep = if number.as_bytes()[pos] == b'.' { '.' } else { ',' };
            let repeated = number.matches(sep).count() > 1;
            if repeated || number.len() - pos - 1 == 3 {
                number.replace(sep, "")
            } else {
                number.replace(sep, ".")
            }
        }
        (None, None) => number.to_string(),
    };

    normalized.parse::<f64>().ok().filter(|p| p.is_finite())
}

fn decode_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

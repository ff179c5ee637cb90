use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;

use crate::ingest::{normalize_text, FetchAdapter};
use crate::model::{RawItem, Source};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Paragraphs shorter than this (chars) are navigation noise.
const MIN_PARAGRAPH_CHARS: usize = 20;

static RE_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").expect("valid paragraph regex"));
static RE_SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("valid script regex")
});

/// Generic HTML page: all `<p>` text long enough to matter, as one raw item.
#[derive(Clone)]
pub struct WebAdapter {
    client: Client,
    timeout: Duration,
}

impl WebAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

impl Default for WebAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchAdapter for WebAdapter {
    async fn fetch(&self, source: &Source) -> Result<Vec<RawItem>> {
        tracing::info!(target: "fetch", source = %source.name, url = %source.url, "fetching web page");
        let mut req = self
            .client
            .get(&source.url)
            .timeout(self.timeout)
            .header(reqwest::header::USER_AGENT, USER_AGENT);
        if source.url.contains("weixin.sogou.com") {
            req = req.header(reqwest::header::REFERER, "https://weixin.sogou.com/");
        }
        let body = req
            .send()
            .await
            .context("web get")?
            .error_for_status()
            .context("web non-2xx")?
            .text()
            .await
            .context("read web body")?;

        let text = extract_paragraphs(&body);
        if text.is_empty() {
            tracing::warn!(target: "fetch", source = %source.name, "no content extracted");
            return Ok(Vec::new());
        }
        Ok(vec![RawItem::new(text).with_url(source.url.clone())])
    }

    fn name(&self) -> &'static str {
        "web"
    }
}

/// Join the normalized text of every long-enough `<p>` with newlines.
pub fn extract_paragraphs(html: &str) -> String {
    let cleaned = RE_SCRIPT.replace_all(html, "");
    RE_PARAGRAPH
        .captures_iter(&cleaned)
        .filter_map(|c| c.get(1))
        .map(|m| normalize_text(m.as_str()))
        .filter(|p| p.chars().count() > MIN_PARAGRAPH_CHARS)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_long_paragraphs() {
        let html = r#"
            <html><head><style>p { color: red }</style></head><body>
            <p>Menu</p>
            <p class="lead">Analysts say <b>$NVDA</b> could see a breakout this quarter.</p>
            <script>var p = "<p>not text at all, really not</p>";</script>
            <p>600519 茅台 目标价 上调，看多后市表现非常强劲的一年</p>
            </body></html>"#;
        let out = extract_paragraphs(html);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Analysts say $NVDA could see a breakout this quarter.");
        assert!(lines[1].starts_with("600519"));
    }
}

// src/ingest/mod.rs
//! Collaborator seams of a cycle: where sources come from and how a source is fetched.

pub mod config;
pub mod types;

pub use config::{load_sources_from, FileSourceSupplier, StaticSources};
pub use types::{FetchAdapter, SourceSupplier};

/// Normalize text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("valid tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize typographic quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("valid ws regex"));
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "  <b>Buy</b>&nbsp;&nbsp; $NVDA  &ldquo;now&rdquo; ";
        assert_eq!(normalize_text(s), r#"Buy $NVDA "now""#);
    }
}

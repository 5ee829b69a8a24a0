//! Text helpers shared by the classifier and the skill handlers.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static URL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"'`]+"#).expect("valid url pattern")
});

static BARE_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|[\s(])((?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,24}(?:[/:][^\s<>"'`]*)?)"#)
        .expect("valid domain pattern")
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '"'];

/// Lower-case and collapse whitespace; used for cache keys and rule matching.
pub fn normalize_query(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A URL found inside free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlMatch {
    /// Token exactly as written, minus trailing punctuation.
    pub raw: String,
    /// Absolute URL with a scheme.
    pub url: String,
    pub start: usize,
    pub end: usize,
}

/// First syntactically valid URL in `text`.
///
/// Only `http(s)://` and `www.` tokens count; bare domains such as
/// `example.com` are too ambiguous in prose.
pub fn find_url(text: &str) -> Option<UrlMatch> {
    URL_TOKEN.find_iter(text).find_map(|m| {
        let raw = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        let absolute = if raw.to_ascii_lowercase().starts_with("www.") {
            format!("https://{}", raw)
        } else {
            raw.to_string()
        };
        let parsed = Url::parse(&absolute).ok()?;
        let host = parsed.host_str()?;
        if !(host.contains('.') || host == "localhost") {
            return None;
        }
        Some(UrlMatch {
            raw: raw.to_string(),
            url: parsed.to_string(),
            start: m.start(),
            end: m.start() + raw.len(),
        })
    })
}

/// Like [`find_url`], but a bare domain such as `example.com` also counts and
/// gets `https://`. For text already known to be about a web page.
pub fn find_link(text: &str) -> Option<UrlMatch> {
    find_url(text).or_else(|| {
        BARE_DOMAIN.captures_iter(text).find_map(|c| {
            let m = c.get(1)?;
            let raw = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            let parsed = Url::parse(&format!("https://{}", raw)).ok()?;
            parsed.host_str()?;
            Some(UrlMatch {
                raw: raw.to_string(),
                url: parsed.to_string(),
                start: m.start(),
                end: m.start() + raw.len(),
            })
        })
    })
}

/// `text` with `span` removed and whitespace collapsed.
pub fn without_span(text: &str, start: usize, end: usize) -> String {
    let mut rest = String::with_capacity(text.len());
    rest.push_str(&text[..start]);
    rest.push(' ');
    rest.push_str(&text[end..]);
    rest.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

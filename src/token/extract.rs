//! CSRF token discovery in page content.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

/// `csrf_token`, `CSRF_TOKEN`, `csrfToken` or `csrf-token` followed by `:` or
/// `=` and a quoted value, also inside escaped JSON (`\"CSRF_TOKEN\":\"...\"`).
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)csrf[_-]?token\\?["']?\s*[:=]\s*\\?["']([^"'\\\s]{8,})"#).unwrap()
});

static INLINE_SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script:not([src])").unwrap());

static PAGE_DATA_SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script#__NEXT_DATA__").unwrap());

static CSRF_META: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="csrf-token"], meta[name="csrf_token"]"#).unwrap()
});

const PAGE_DATA_KEYS: &[&str] = &["csrf_token", "CSRF_TOKEN", "csrfToken"];

/// Match the token pattern in a piece of text.
pub fn token_from_text(text: &str) -> Option<String> {
    TOKEN_PATTERN
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Search inline `<script>` bodies (no `src`) for the token pattern.
pub fn token_from_inline_scripts(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&INLINE_SCRIPT)
        .find_map(|script| token_from_text(&script.text().collect::<String>()))
}

/// Search the raw page HTML for the token pattern.
pub fn token_from_html(html: &str) -> Option<String> {
    token_from_text(html)
}

/// Look the token up in the page's global data object (`__NEXT_DATA__`).
pub fn token_from_page_data(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let script = document.select(&PAGE_DATA_SCRIPT).next()?;
    let data: Value = serde_json::from_str(&script.text().collect::<String>()).ok()?;
    find_token_key(&data)
}

fn find_token_key(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            for key in PAGE_DATA_KEYS {
                if let Some(token) = map.get(*key).and_then(|v| v.as_str()) {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
            map.values().find_map(find_token_key)
        }
        Value::Array(arr) => arr.iter().find_map(find_token_key),
        _ => None,
    }
}

/// Read `<meta name="csrf-token" content="...">`.
pub fn token_from_meta(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&CSRF_META)
        .filter_map(|meta| meta.value().attr("content"))
        .map(|content| content.trim())
        .find(|content| !content.is_empty())
        .map(|content| content.to_string())
}

/// Full document search used when refetching a page: meta tag first,
/// then inline scripts, raw HTML and page data.
pub fn token_from_document(html: &str) -> Option<String> {
    token_from_meta(html)
        .or_else(|| token_from_inline_scripts(html))
        .or_else(|| token_from_html(html))
        .or_else(|| token_from_page_data(html))
}

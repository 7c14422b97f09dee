use once_cell::sync::Lazy;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::collections::HashSet;

pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Conventionally non-sensitive headers whose values may be shown in
/// reported output. Everything else from the config or auth layers is
/// replaced with the redaction marker.
static SAFE_HEADERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "accept",
        "accept-language",
        "content-type",
        "user-agent",
        "cache-control",
        "if-match",
        "if-none-match",
        "if-modified-since",
        "if-unmodified-since",
    ]
    .into_iter()
    .collect()
});

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

pub fn is_safe_header(name: &str) -> bool {
    SAFE_HEADERS.contains(normalize_key(name).as_str())
}

/// Sanitizes a single header value under the non-one-time rule set:
/// `Authorization` and the configured API-key header are redacted
/// unconditionally; anything outside the safe-header allow-list is
/// redacted too. One-time per-call headers never go through here.
pub fn sanitize_header(name: &str, value: &str, api_key_header: Option<&str>) -> String {
    let normalized = normalize_key(name);
    if normalized == "authorization" {
        return REDACTION_MARKER.to_string();
    }
    if let Some(api_key) = api_key_header {
        if normalized == normalize_key(api_key) {
            return REDACTION_MARKER.to_string();
        }
    }
    if SAFE_HEADERS.contains(normalized.as_str()) {
        value.to_string()
    } else {
        REDACTION_MARKER.to_string()
    }
}

/// Sanitizes a full response header map with the non-one-time rules.
pub fn sanitize_header_map(headers: &HeaderMap, api_key_header: Option<&str>) -> Value {
    let mut out = serde_json::Map::new();
    for (name, value) in headers {
        let text = match value.to_str() {
            Ok(text) => text,
            Err(_) => continue,
        };
        out.insert(
            name.as_str().to_string(),
            Value::String(sanitize_header(name.as_str(), text, api_key_header)),
        );
    }
    Value::Object(out)
}

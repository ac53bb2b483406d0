use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

// ============================================================================
// Encoded URL - identity of a note
// ============================================================================
//
// A note is keyed by the URL it annotates. The URL is normalized first so
// trivially different spellings land on the same note, then encoded with
// URL-safe base64 (no padding) so the key is safe as a path segment and a
// document key. Encoding is injective over normalized URLs.
//
// ============================================================================

/// Canonical form of a URL:
/// - surrounding whitespace and `#fragment` removed
/// - scheme and host lowercased
/// - trailing `/` removed
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_fragment = trimmed.split('#').next().unwrap_or_default();

    let mut normalized = match without_fragment.split_once("://") {
        Some((scheme, rest)) => {
            let host_end = rest.find(['/', '?']).unwrap_or(rest.len());
            let (host, tail) = rest.split_at(host_end);
            format!("{}://{}{}", scheme.to_lowercase(), host.to_lowercase(), tail)
        }
        None => without_fragment.to_string(),
    };

    while normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// Document key for a URL; empty when the URL is blank
pub fn encode_url(raw: &str) -> String {
    let normalized = normalize_url(raw);
    if normalized.is_empty() {
        return String::new();
    }
    URL_SAFE_NO_PAD.encode(normalized.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("  HTTPS://Docs.RS/tokio/latest/ "),
            "https://docs.rs/tokio/latest"
        );
        assert_eq!(
            normalize_url("https://example.com/Path?Q=1#section"),
            "https://example.com/Path?Q=1"
        );
        assert_eq!(normalize_url("https://example.com/"), "https://example.com");
        assert_eq!(normalize_url("example.com/a/"), "example.com/a");
        assert_eq!(normalize_url("   "), "");
    }

    #[test]
    fn test_encode_is_deterministic_and_normalizing() {
        let a = encode_url("https://example.com/a");
        assert_eq!(a, encode_url("https://example.com/a"));
        assert_eq!(a, encode_url("HTTPS://EXAMPLE.com/a/"));
        assert!(!a.is_empty());
    }

    #[test]
    fn test_encode_is_key_safe() {
        let key = encode_url("https://example.com/a?b=c&d=e/f+g");
        assert!(key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_distinct_urls_do_not_collide() {
        let urls = [
            "https://example.com/a",
            "https://example.com/A",
            "https://example.com/a?x=1",
            "http://example.com/a",
            "https://example.com/ab",
        ];
        let keys: std::collections::HashSet<String> = urls.iter().map(|u| encode_url(u)).collect();
        assert_eq!(keys.len(), urls.len());
    }

    #[test]
    fn test_blank_url_has_empty_key() {
        assert_eq!(encode_url(""), "");
        assert_eq!(encode_url(" / "), "");
    }
}

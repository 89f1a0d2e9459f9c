//! Redaction of credentials before they reach log output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Header names whose values are never logged verbatim.
const SENSITIVE_HEADERS: &[&str] = &["authorization", "proxy-authorization", "cookie", "set-cookie", "x-api-key", "x-auth-token"];

static REDACT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization:\s*)([^\s]+(?:\s+[^\s]+)*)",
        r"(?i)((?:^|\b)Bearer\s+)([A-Za-z0-9\-._~+/]+=*)",
        r"(?i)((?:^|\b)Basic\s+)([A-Za-z0-9+/]+=*)",
        r"(?i)([A-Z0-9_]*?(?:KEY|TOKEN|SECRET|PASSWORD)=)([^\s]+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Redacts values that look like secrets in a string.
///
/// ```rust
/// use upward_util::redact_sensitive;
///
/// assert_eq!(redact_sensitive("Authorization: Bearer abc123"), "Authorization: <redacted>");
/// assert_eq!(redact_sensitive("API_TOKEN=abc123 next"), "API_TOKEN=<redacted> next");
/// ```
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in REDACT_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}<redacted>", prefix)
            })
            .to_string();
    }
    redacted
}

/// Returns true when the header carries credentials.
pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADERS.iter().any(|sensitive| sensitive.eq_ignore_ascii_case(name.trim()))
}

/// Produces a log-safe rendition of a single header value.
pub fn redact_header_value(name: &str, value: &str) -> String {
    if is_sensitive_header(name) {
        return "<redacted>".to_string();
    }
    redact_sensitive(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_bearer_tokens() {
        assert_eq!(redact_sensitive("token is Bearer s3cr3t"), "token is Bearer <redacted>");
    }

    #[test]
    fn test_leaves_plain_text_alone() {
        assert_eq!(redact_sensitive("content-type: application/json"), "content-type: application/json");
    }

    #[test]
    fn test_header_redaction_by_name() {
        assert!(is_sensitive_header("Authorization"));
        assert!(is_sensitive_header(" X-Api-Key "));
        assert!(!is_sensitive_header("accept"));
        assert_eq!(redact_header_value("cookie", "session=1"), "<redacted>");
        assert_eq!(redact_header_value("accept", "application/json"), "application/json");
    }
}

//! Shared helpers for the Upward workspace: secret redaction for log output,
//! config path expansion, and summary truncation for error messages.

mod path_processing;
mod redaction;

pub use path_processing::{config_file_path, expand_tilde};
pub use redaction::{is_sensitive_header, redact_header_value, redact_sensitive};

/// Truncate `text` to at most `max_len` characters, appending `...` when shortened.
///
/// Used to keep transport error messages readable when a remote service answers
/// with a large HTML or JSON body.
pub fn truncate_for_summary(text: &str, max_len: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }

    // Reserve space for the trailing ellipsis ("...").
    let target_len = max_len.saturating_sub(3);
    let truncated: String = trimmed.chars().take(target_len).collect();
    format!("{}...", truncated.trim_end())
}

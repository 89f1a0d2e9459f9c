//! Error types for definition resolution.

use thiserror::Error;
use upward_util::redact_sensitive;

/// Failure raised while resolving a definition tree.
///
/// Every variant is cheap to clone so that a pending context entry can hand the
/// same failure to each lookup that awaited it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolveError {
    /// The definition does not have the shape its resolver requires.
    #[error("Invalid arguments to {resolver} resolver: {definition}\n\n{message}")]
    Validation {
        resolver: &'static str,
        definition: String,
        message: String,
    },

    /// A sub-field resolved to a type the resolver cannot use.
    #[error("Unknown type passed to '{field}': expected {expected}, got {found}.")]
    UnknownType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Context key not found: {key}")]
    KeyNotFound { key: String },

    /// The remote service answered with application-level errors.
    ///
    /// Only the first message is surfaced; `discarded` counts the rest.
    #[error("{message}")]
    Protocol { message: String, discarded: usize },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("GraphQL document failed to compile: {message}")]
    Compile { message: String },

    #[error("Field '{field}' is missing from the definition")]
    MissingField { field: String },

    #[error("Context key '{key}' is already set to a different value")]
    ContextConflict { key: String },

    #[error("Environment variable not set: {name}")]
    MissingEnvironmentVariable { name: String },

    #[error("Definition matches several resolver kinds ({kinds}): {definition}")]
    AmbiguousDefinition { kinds: String, definition: String },
}

/// Failure raised by the network layer before a GraphQL payload could be read.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("Invalid request URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("No response available for {method} {url}")]
    NoResponse { method: String, url: String },
}

impl ResolveError {
    /// Create a validation error that echoes the offending definition.
    pub fn validation(resolver: &'static str, definition: &serde_json::Value, message: impl Into<String>) -> Self {
        let definition = serde_json::to_string_pretty(definition).unwrap_or_else(|_| definition.to_string());
        Self::Validation {
            resolver,
            definition,
            message: message.into(),
        }
    }

    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }

    pub fn compile(message: impl Into<String>) -> Self {
        Self::Compile { message: message.into() }
    }

    /// True for failures raised before any external effect took place.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::AmbiguousDefinition { .. })
    }
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        let message = error_chain(&error);
        if let Some(status) = error.status() {
            return Self::Status {
                status: status.as_u16(),
                body: message,
            };
        }
        Self::network(message)
    }
}

/// `error` followed by each of its sources, separated by `": "`.
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    redact_sensitive(&message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validation_error_echoes_definition() {
        let error = ResolveError::validation("service", &json!({"query": "{ ping }"}), "No URL specified.");
        let message = error.to_string();
        assert!(message.starts_with("Invalid arguments to service resolver:"));
        assert!(message.contains("\"query\": \"{ ping }\""));
        assert!(message.ends_with("No URL specified."));
        assert!(error.is_validation());
    }

    #[test]
    fn test_protocol_error_displays_first_message_only() {
        let error = ResolveError::Protocol {
            message: "boom".into(),
            discarded: 2,
        };
        assert_eq!(error.to_string(), "boom");
    }

    #[test]
    fn test_transport_error_converts() {
        let error: ResolveError = TransportError::network("connection refused").into();
        assert_eq!(error.to_string(), "Transport error: Network error: connection refused");
        assert!(!error.is_validation());
    }

    #[derive(Debug, Error)]
    #[error("client error (Connect)")]
    struct ConnectError {
        #[source]
        source: std::io::Error,
    }

    #[test]
    fn test_error_chain_keeps_sources() {
        let error = ConnectError {
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "tcp connect error"),
        };
        assert_eq!(error_chain(&error), "client error (Connect): tcp connect error");
    }
}

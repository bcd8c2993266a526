//! Error types for the GLPI client.
//!
//! This module defines `GlpiError`, the single error type returned by the
//! configuration layer, the session/transport layer and the item router.
//!
//! # Security
//!
//! Error messages may be built from server responses. Use
//! `sanitize_message()` before logging or returning them so that app tokens,
//! user tokens, passwords and session tokens never leak.

use reqwest::StatusCode;
use thiserror::Error;

/// Unified error type for all GLPI operations.
///
/// Router operations never panic on service failures: they return one of
/// these variants instead. Use [`GlpiError::message_error`] to obtain the
/// legacy `{"message_error": "..."}` map.
#[derive(Error, Debug)]
pub enum GlpiError {
    /// Configuration error - missing, conflicting or invalid credentials.
    #[error("configuration error: {0}")]
    Config(String),

    /// Session initialization failed, or no session token could be obtained.
    #[error("session error: {0}")]
    Session(String),

    /// A search field name has no numeric code in the search engine table.
    #[error("search field not mapped: {field}")]
    Lookup {
        /// The unmapped field name.
        field: String,
    },

    /// Caller input was malformed (e.g. a non-integer item id).
    #[error("validation error: {0}")]
    Validation(String),

    /// HTTP request failed during transmission.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// A caller supplied header name or value is not valid HTTP.
    #[error("invalid header {name}: {message}")]
    InvalidHeader {
        /// The offending header name.
        name: String,
        /// Why it was rejected.
        message: String,
    },

    /// The service answered with something that is not JSON.
    #[error("unexpected response (HTTP {status}): {message}")]
    UnexpectedResponse {
        /// The HTTP status code returned.
        status: StatusCode,
        /// Text recovered from the body (HTML tokens when available).
        message: String,
    },
}

impl GlpiError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        GlpiError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        GlpiError::Config(message.into())
    }

    /// Creates a session error.
    pub fn session(message: impl Into<String>) -> Self {
        GlpiError::Session(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        GlpiError::Validation(message.into())
    }

    /// Creates a lookup error for an unmapped search field.
    pub fn lookup(field: impl Into<String>) -> Self {
        GlpiError::Lookup {
            field: field.into(),
        }
    }

    /// Returns true for failures caused by the service or the configuration,
    /// as opposed to malformed caller input.
    #[must_use]
    pub fn is_service_failure(&self) -> bool {
        matches!(
            self,
            GlpiError::Config(_)
                | GlpiError::Session(_)
                | GlpiError::Http(_)
                | GlpiError::HttpClient(_)
                | GlpiError::UnexpectedResponse { .. }
        )
    }

    /// Renders this error as the `{"message_error": "..."}` map returned by
    /// older GLPI clients.
    #[must_use]
    pub fn message_error(&self) -> serde_json::Value {
        serde_json::json!({ "message_error": self.to_string() })
    }

    /// Replaces every occurrence of each secret in `message` with `[REDACTED]`.
    ///
    /// Empty secrets are ignored.
    #[must_use]
    pub fn sanitize_message(message: &str, secrets: &[&str]) -> String {
        secrets
            .iter()
            .filter(|secret| !secret.is_empty())
            .fold(message.to_string(), |acc, secret| {
                acc.replace(secret, "[REDACTED]")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_error() {
        let err = GlpiError::missing_env("GLPI_APP_TOKEN");
        assert!(err.to_string().contains("GLPI_APP_TOKEN"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_validation_error() {
        let err = GlpiError::validation("id must be an integer");
        assert_eq!(err.to_string(), "validation error: id must be an integer");
    }

    #[test]
    fn test_lookup_error() {
        let err = GlpiError::lookup("color");
        assert_eq!(err.to_string(), "search field not mapped: color");
        assert!(!err.is_service_failure());
    }

    #[test]
    fn test_session_error_is_service_failure() {
        let err = GlpiError::session("Init session to GLPI server fails");
        assert!(err.is_service_failure());
    }

    #[test]
    fn test_validation_is_not_service_failure() {
        assert!(!GlpiError::validation("bad").is_service_failure());
    }

    #[test]
    fn test_message_error_shape() {
        let err = GlpiError::validation("Please define item_id to be deleted.");
        let value = err.message_error();
        assert_eq!(
            value["message_error"],
            "validation error: Please define item_id to be deleted."
        );
        assert_eq!(value.as_object().map(|m| m.len()), Some(1));
    }

    #[test]
    fn test_sanitize_message_removes_all_secrets() {
        let message = "app abc123 with user token tok456 failed";
        let sanitized = GlpiError::sanitize_message(message, &["abc123", "tok456"]);
        assert!(!sanitized.contains("abc123"));
        assert!(!sanitized.contains("tok456"));
        assert_eq!(sanitized.matches("[REDACTED]").count(), 2);
    }

    #[test]
    fn test_sanitize_message_empty_secret() {
        let message = "Some error message";
        let sanitized = GlpiError::sanitize_message(message, &[""]);
        assert_eq!(sanitized, message);
    }

    #[test]
    fn test_unexpected_response_display() {
        let err = GlpiError::UnexpectedResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "MySQL server has gone away".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("MySQL server has gone away"));
    }
}

//! Responses returned by the GLPI REST API.
//!
//! GLPI answers in JSON, except when something below the API breaks (e.g.
//! the database is down) and an HTML error page comes back instead. The
//! helpers here recover readable text from those pages.

use reqwest::StatusCode;
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;

use crate::error::GlpiError;

/// Maximum length of a raw body quoted in an error message.
const MAX_ERROR_BODY_LEN: usize = 500;

/// Body of a successful `initSession` call.
#[derive(Debug, Clone, Deserialize)]
pub struct InitSessionResponse {
    /// The new session token.
    pub session_token: String,
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response body as text.
    pub body: String,
}

impl RawResponse {
    /// Creates a response from its parts.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Parses the body as JSON, whatever the status.
    ///
    /// GLPI reports most failures as JSON arrays such as
    /// `["ERROR_ITEM_NOT_FOUND", "..."]`; those are returned as values for the
    /// caller to interpret. An empty body parses as `null`.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::UnexpectedResponse` if the body is not JSON.
    pub fn json(&self) -> Result<Value, GlpiError> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body).map_err(|_| GlpiError::UnexpectedResponse {
            status: self.status,
            message: self.diagnostic(),
        })
    }

    /// Best-effort readable summary of the body.
    ///
    /// Uses the HTML text tokens when there are any, otherwise the start of
    /// the raw body.
    pub fn diagnostic(&self) -> String {
        let tokens = html_tokens(&self.body);
        if !tokens.is_empty() {
            return tokens.join(" ");
        }
        if self.body.chars().count() > MAX_ERROR_BODY_LEN {
            let head: String = self.body.chars().take(MAX_ERROR_BODY_LEN).collect();
            format!("{}...[truncated]", head)
        } else {
            self.body.clone()
        }
    }
}

/// Collects the non-empty text tokens of an HTML document.
///
/// Tokens starting with `/` are dropped.
pub fn html_tokens(content: &str) -> Vec<String> {
    let document = Html::parse_document(content);
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|token| !token.is_empty() && !token.starts_with('/'))
        .map(str::to_string)
        .collect()
}

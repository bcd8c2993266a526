//! Session and transport layer for the GLPI REST API.
//!
//! `GlpiService` owns the HTTP client, the credentials and the session
//! token. It opens the session lazily, attaches the session and app tokens
//! to every request, and hands raw responses back to the caller.
//!
//! Nothing here retries. A failed call surfaces immediately.
//!
//! # Security
//!
//! Tokens and passwords are never logged. Header values carrying them are
//! marked sensitive, and error text is sanitized before it is logged.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value};

use crate::config::{AuthMode, Config};
use crate::error::GlpiError;
use crate::models::{InitSessionResponse, RawResponse};

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("glpi-sdk-python-", env!("CARGO_PKG_VERSION"));

const APP_TOKEN_HEADER: &str = "app-token";
const SESSION_TOKEN_HEADER: &str = "session-token";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Per-call request settings.
///
/// `None` header values and `null` params are dropped before sending.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Send `Accept: application/json`.
    pub accept_json: bool,
    /// Extra headers; they override the defaults.
    pub headers: Vec<(String, Option<String>)>,
    /// Query parameters.
    pub params: Map<String, Value>,
    /// JSON body.
    pub body: Option<Value>,
}

impl RequestOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks for a JSON response.
    pub fn accept_json(mut self) -> Self {
        self.accept_json = true;
        self
    }

    /// Adds a header. A `None` value removes nothing and sends nothing.
    pub fn with_header(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.headers.push((name.into(), value));
        self
    }

    /// Adds a query parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Sets the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Authenticated access to one GLPI REST endpoint.
///
/// Holds at most one session token. The token is created on first use and
/// kept until [`kill_session`](Self::kill_session) is called; expiry on the
/// server side is not detected.
pub struct GlpiService {
    /// The underlying HTTP client.
    http: Client,

    /// Base URL of the REST API, without trailing slash.
    base_url: String,

    /// App token. SECURITY: Never log this value!
    app_token: String,

    /// Credentials for `initSession`. SECURITY: Never log these values!
    auth: AuthMode,

    /// Ask for `session_write=true`.
    writable: bool,

    /// Current session token.
    session_token: Option<String>,

    /// Item path most recently selected by the router.
    uri: Option<String>,
}

impl GlpiService {
    /// Creates a service from configuration. No request is sent.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(config: &Config) -> Result<Self, GlpiError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(!config.ssl_verify)
            .build()
            .map_err(GlpiError::HttpClient)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_token: config.app_token.clone(),
            auth: config.auth.clone(),
            writable: config.writable,
            session_token: None,
            uri: None,
        })
    }

    /// Joins the base URL and a path, ignoring separators around the path.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_matches('/'))
    }

    /// Selects the item path used by the router's next operation.
    pub fn set_uri(&mut self, uri: impl Into<String>) {
        self.uri = Some(uri.into());
    }

    /// The item path most recently selected.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Returns true once a session token is held.
    pub fn has_session(&self) -> bool {
        self.session_token.is_some()
    }

    /// Opens a new session and stores its token.
    ///
    /// Authenticates with the configured [`AuthMode`]: a user token goes in
    /// `Authorization: user_token <token>`, a login uses HTTP basic auth.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Session` when the server does not answer 200 with
    /// a `session_token`, with any text recovered from an HTML error page.
    /// Returns `GlpiError::Http` when the server cannot be reached.
    pub async fn init_session(&mut self) -> Result<String, GlpiError> {
        let mut url = self.url("initSession");
        if self.writable {
            url.push_str("?session_write=true");
        }

        tracing::debug!(writable = self.writable, "Initializing GLPI session");

        let req = self
            .http
            .get(&url)
            .header(APP_TOKEN_HEADER, sensitive(APP_TOKEN_HEADER, &self.app_token)?)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);

        let req = match &self.auth {
            AuthMode::Token { token } => req.header(
                AUTHORIZATION,
                sensitive("authorization", &format!("user_token {}", token))?,
            ),
            AuthMode::Basic { username, password } => req.basic_auth(username, Some(password)),
        };

        let response = req.send().await.map_err(|e| {
            tracing::error!(
                error = %self.sanitize(&e.to_string()),
                "initSession request failed"
            );
            GlpiError::Http(e)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(GlpiError::Http)?;
        let raw = RawResponse::new(status, body);

        if status != StatusCode::OK {
            let details = self.sanitize(&raw.diagnostic());
            tracing::warn!(status = %status, details = %details, "GLPI refused to open a session");
            return Err(GlpiError::session(format!(
                "Init session to GLPI server fails: {}",
                details
            )));
        }

        let parsed: InitSessionResponse = serde_json::from_str(&raw.body).map_err(|_| {
            GlpiError::session(format!(
                "Init session response from GLPI server has no session token: {}",
                self.sanitize(&raw.diagnostic())
            ))
        })?;

        tracing::info!("GLPI session initialized");
        self.session_token = Some(parsed.session_token.clone());
        Ok(parsed.session_token)
    }

    /// Returns the session token, opening a session first if none exists.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`init_session`](Self::init_session).
    pub async fn session_token(&mut self) -> Result<String, GlpiError> {
        match &self.session_token {
            Some(token) => Ok(token.clone()),
            None => self.init_session().await,
        }
    }

    /// Replaces the session token with one obtained elsewhere.
    ///
    /// Empty tokens are ignored. Returns the token now held.
    pub fn update_session_token(&mut self, token: &str) -> Option<&str> {
        if !token.is_empty() {
            self.session_token = Some(token.to_string());
        }
        self.session_token.as_deref()
    }

    /// Closes the current session on the server and forgets its token.
    ///
    /// The token is dropped even if the server call fails, so the next
    /// request opens a fresh session. Does nothing without a session.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Http` when the server cannot be reached.
    pub async fn kill_session(&mut self) -> Result<(), GlpiError> {
        let Some(token) = self.session_token.take() else {
            return Ok(());
        };

        let response = self
            .http
            .get(self.url("killSession"))
            .header(APP_TOKEN_HEADER, sensitive(APP_TOKEN_HEADER, &self.app_token)?)
            .header(SESSION_TOKEN_HEADER, sensitive(SESSION_TOKEN_HEADER, &token)?)
            .send()
            .await
            .map_err(GlpiError::Http)?;

        if response.status().is_success() {
            tracing::info!("GLPI session closed");
        } else {
            tracing::warn!(status = %response.status(), "killSession was not acknowledged");
        }
        Ok(())
    }

    /// Sends a request to `{base_url}/{path}`.
    ///
    /// Opens the session first when needed, then attaches the session and
    /// app tokens and the caller's headers (caller values win). Null params
    /// and top-level null body entries are dropped, booleans are sent as
    /// `"true"`/`"false"`.
    ///
    /// Non-2xx statuses are not errors here; GLPI describes failures in the
    /// JSON body and the caller interprets it.
    ///
    /// # Errors
    ///
    /// - `GlpiError::Session` if no session could be opened
    /// - `GlpiError::InvalidHeader` for a malformed caller header
    /// - `GlpiError::Http` if the request could not be sent (logged with the
    ///   path and payload)
    pub async fn request(
        &mut self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<RawResponse, GlpiError> {
        let url = self.url(path);

        let session = match self.session_token.clone() {
            Some(token) => token,
            None => self.init_session().await.map_err(|e| match e {
                GlpiError::Session(message) => GlpiError::session(format!(
                    "Unable to get Session token. ERROR: {}",
                    message
                )),
                other => other,
            })?,
        };

        let headers = self.build_headers(&session, &options)?;
        let params = normalize_params(&options.params);
        let payload = options
            .body
            .map(strip_null_entries)
            .map(|body| body.to_string());

        tracing::debug!(method = %method, path = %path, "Making GLPI API request");

        let mut req = self.http.request(method.clone(), &url).headers(headers);
        if !params.is_empty() {
            req = req.query(&params);
        }
        if let Some(ref payload) = payload {
            req = req.body(payload.clone());
        }

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    method = %method,
                    path = %path,
                    payload = %payload.as_deref().unwrap_or(""),
                    error = %self.sanitize(&e.to_string()),
                    "ERROR requesting GLPI"
                );
                return Err(GlpiError::Http(e));
            }
        };

        let status = response.status();
        let body = response.text().await.map_err(GlpiError::Http)?;

        tracing::trace!(status = %status, body = %body, "GLPI API response");

        Ok(RawResponse::new(status, body))
    }

    /// Builds the headers of a generic request.
    fn build_headers(&self, session: &str, options: &RequestOptions) -> Result<HeaderMap, GlpiError> {
        let mut headers = HeaderMap::new();

        if options.accept_json {
            headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }
        if options.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }
        headers.insert(
            HeaderName::from_static(SESSION_TOKEN_HEADER),
            sensitive(SESSION_TOKEN_HEADER, session)?,
        );
        headers.insert(
            HeaderName::from_static(APP_TOKEN_HEADER),
            sensitive(APP_TOKEN_HEADER, &self.app_token)?,
        );

        for (name, value) in &options.headers {
            let Some(value) = value else {
                continue;
            };
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| GlpiError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| GlpiError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }

    /// Every secret this service holds.
    fn secrets(&self) -> Vec<&str> {
        let mut secrets = vec![self.app_token.as_str()];
        secrets.extend(self.auth.secrets());
        if let Some(token) = &self.session_token {
            secrets.push(token.as_str());
        }
        secrets
    }

    /// Removes every secret from a message.
    pub(crate) fn sanitize(&self, message: &str) -> String {
        GlpiError::sanitize_message(message, &self.secrets())
    }
}

/// Builds a header value that is hidden from debug output.
fn sensitive(name: &str, value: &str) -> Result<HeaderValue, GlpiError> {
    let mut header = HeaderValue::from_str(value).map_err(|_| GlpiError::InvalidHeader {
        name: name.to_string(),
        message: "value contains characters not allowed in HTTP headers".to_string(),
    })?;
    header.set_sensitive(true);
    Ok(header)
}

/// Drops null params and renders the rest as query strings.
fn normalize_params(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::Bool(true) => "true".to_string(),
                Value::Bool(false) => "false".to_string(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), value))
        })
        .collect()
}

/// Drops top-level null entries of an object body.
fn strip_null_entries(body: Value) -> Value {
    match body {
        Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn test_service() -> GlpiService {
        let config = Config::builder()
            .base_url("https://glpi.example.com/apirest.php/")
            .app_token("app-token-123")
            .user_token("user-token-456")
            .build_with_bundle(None)
            .expect("valid test config");
        GlpiService::new(&config).expect("Failed to create test service")
    }

    #[test]
    fn test_url_strips_separators() {
        let service = test_service();
        assert_eq!(
            service.url("/Ticket/"),
            "https://glpi.example.com/apirest.php/Ticket"
        );
        assert_eq!(
            service.url("Ticket/12"),
            "https://glpi.example.com/apirest.php/Ticket/12"
        );
    }

    #[test]
    fn test_normalize_params() {
        let mut params = Map::new();
        params.insert("expand_dropdowns".to_string(), json!(true));
        params.insert("with_logs".to_string(), json!(false));
        params.insert("range".to_string(), json!("0-50"));
        params.insert("entities_id".to_string(), json!(3));
        params.insert("missing".to_string(), Value::Null);

        let mut normalized = normalize_params(&params);
        normalized.sort();
        assert_eq!(
            normalized,
            vec![
                ("entities_id".to_string(), "3".to_string()),
                ("expand_dropdowns".to_string(), "true".to_string()),
                ("range".to_string(), "0-50".to_string()),
                ("with_logs".to_string(), "false".to_string()),
            ]
        );
    }

    #[test]
    fn test_strip_null_entries_keeps_nested_nulls() {
        let body = json!({"input": {"comment": null}, "force": null});
        assert_eq!(strip_null_entries(body), json!({"input": {"comment": null}}));
    }

    #[test]
    fn test_build_headers_caller_wins_and_nulls_dropped() {
        let service = test_service();
        let options = RequestOptions::new()
            .accept_json()
            .with_header("App-Token", Some("override".to_string()))
            .with_header("X-Skip", None)
            .with_header("X-Extra", Some("1".to_string()));

        let headers = service.build_headers("sess", &options).unwrap();
        assert_eq!(headers.get("app-token").unwrap(), "override");
        assert_eq!(headers.get("session-token").unwrap(), "sess");
        assert_eq!(headers.get("accept").unwrap(), "application/json");
        assert_eq!(headers.get("x-extra").unwrap(), "1");
        assert!(headers.get("x-skip").is_none());
        assert!(headers.get("content-type").is_none());
    }

    #[test]
    fn test_build_headers_rejects_bad_header() {
        let service = test_service();
        let options = RequestOptions::new().with_header("Bad Header", Some("x".to_string()));
        let err = service.build_headers("sess", &options).unwrap_err();
        assert!(matches!(err, GlpiError::InvalidHeader { .. }));
    }

    #[test]
    fn test_update_session_token() {
        let mut service = test_service();
        assert!(!service.has_session());
        assert_eq!(service.update_session_token(""), None);
        assert_eq!(service.update_session_token("abc"), Some("abc"));
        assert!(service.has_session());
    }

    #[test]
    fn test_sanitize_hides_tokens() {
        let mut service = test_service();
        service.update_session_token("sess-789");
        let message = "app-token-123 user-token-456 sess-789";
        assert_eq!(
            service.sanitize(message),
            "[REDACTED] [REDACTED] [REDACTED]"
        );
    }

    #[test]
    fn test_user_agent() {
        assert_eq!(
            USER_AGENT,
            format!("glpi-sdk-python-{}", env!("CARGO_PKG_VERSION"))
        );
    }
}

//! Configuration for the GLPI client.
//!
//! Credentials come from explicit builder arguments, from `GLPI_*`
//! environment variables, or from a `VCAP_SERVICES` style credential bundle.
//! Whatever the source, a built [`Config`] always carries an app token and
//! exactly one [`AuthMode`].

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::GlpiError;

/// Environment variable holding the JSON credential bundle.
pub const VCAP_SERVICES_ENV: &str = "VCAP_SERVICES";

/// Default HTTP timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const PLACEHOLDER_USERNAME: &str = "YOUR SERVICE USERNAME";
const PLACEHOLDER_PASSWORD: &str = "YOUR SERVICE PASSWORD";
const PLACEHOLDER_TOKEN: &str = "YOUR AUTH TOKEN";

/// How `initSession` authenticates.
///
/// The transport layer turns this into request headers; the variant carries
/// data only.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// HTTP basic authentication with a GLPI login.
    Basic {
        /// GLPI login name.
        username: String,
        /// GLPI password.
        password: String,
    },
    /// Personal API token, sent as `Authorization: user_token <token>`.
    Token {
        /// The user token.
        token: String,
    },
}

impl AuthMode {
    /// Values that must never appear in logs or error messages.
    pub fn secrets(&self) -> Vec<&str> {
        match self {
            AuthMode::Basic { password, .. } => vec![password.as_str()],
            AuthMode::Token { token } => vec![token.as_str()],
        }
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            AuthMode::Token { .. } => f
                .debug_struct("Token")
                .field("token", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Validated configuration for connecting to a GLPI REST endpoint.
///
/// The app token and credentials are kept in memory only. `Config` has no
/// `Debug` implementation so it cannot be logged by accident.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the REST API (e.g. `https://glpi.example.com/apirest.php`).
    pub base_url: String,

    /// App token identifying the calling application.
    /// This value must never be logged or included in error messages.
    pub app_token: String,

    /// Credentials used by `initSession`.
    pub auth: AuthMode,

    /// Open sessions with `session_write=true`.
    pub writable: bool,

    /// Verify TLS certificates.
    pub ssl_verify: bool,

    /// Per-request timeout.
    pub timeout: Duration,
}

// Test-only, redacted: lets tests call `unwrap_err()` on `Result<Config, _>`
// without giving production code a `Debug` impl.
#[cfg(test)]
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config").finish_non_exhaustive()
    }
}

impl Config {
    /// Starts an empty builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `GLPI_URL`: base URL of the REST API
    /// - `GLPI_APP_TOKEN`: application token
    /// - `GLPI_USER_TOKEN`, or `GLPI_USERNAME` and `GLPI_PASSWORD`
    /// - `GLPI_SESSION_WRITE`: open write sessions (optional)
    /// - `GLPI_SSL_VERIFY`: verify TLS certificates (optional, default true)
    /// - `GLPI_TIMEOUT_SECS`: request timeout (optional, default 30)
    /// - `GLPI_VCAP_SERVICE`: service name to read from `VCAP_SERVICES` (optional)
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Config` when no usable credential set can be
    /// resolved, when credentials conflict, or when a value is malformed.
    pub fn from_env() -> Result<Self, GlpiError> {
        let mut builder = Config::builder();

        if let Some(url) = Self::get_optional_env("GLPI_URL") {
            builder = builder.base_url(url);
        }
        if let Some(app_token) = Self::get_optional_env("GLPI_APP_TOKEN") {
            builder = builder.app_token(app_token);
        }
        if let Some(token) = Self::get_optional_env("GLPI_USER_TOKEN") {
            builder = builder.user_token(token);
        }
        if let Some(username) = Self::get_optional_env("GLPI_USERNAME") {
            builder = builder.username(username);
        }
        if let Some(password) = Self::get_optional_env("GLPI_PASSWORD") {
            builder = builder.password(password);
        }
        if let Some(value) = Self::get_optional_env("GLPI_SESSION_WRITE") {
            builder = builder.writable(Self::parse_flag("GLPI_SESSION_WRITE", &value)?);
        }
        if let Some(value) = Self::get_optional_env("GLPI_SSL_VERIFY") {
            builder = builder.ssl_verify(Self::parse_flag("GLPI_SSL_VERIFY", &value)?);
        }
        if let Some(value) = Self::get_optional_env("GLPI_TIMEOUT_SECS") {
            let secs = value.trim().parse::<u64>().map_err(|_| {
                GlpiError::invalid_config("GLPI_TIMEOUT_SECS must be a whole number of seconds")
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(service) = Self::get_optional_env("GLPI_VCAP_SERVICE") {
            builder = builder.credential_bundle(service);
        }

        builder.build()
    }

    /// Every secret this configuration holds, for message sanitization.
    pub fn secrets(&self) -> Vec<&str> {
        let mut secrets = vec![self.app_token.as_str()];
        secrets.extend(self.auth.secrets());
        secrets
    }

    /// Gets an environment variable, treating empty values as absent.
    fn get_optional_env(name: &str) -> Option<String> {
        env::var(name).ok().filter(|value| !value.trim().is_empty())
    }

    fn parse_flag(name: &str, value: &str) -> Result<bool, GlpiError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(GlpiError::invalid_config(format!(
                "{} must be true or false",
                name
            ))),
        }
    }

    /// Validates and normalizes the base URL.
    fn validate_base_url(url: &str) -> Result<String, GlpiError> {
        let url = url.trim().trim_end_matches('/').to_string();

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(GlpiError::invalid_config(
                "GLPI base URL must start with http:// or https://",
            ));
        }

        url::Url::parse(&url)
            .map_err(|e| GlpiError::invalid_config(format!("invalid GLPI base URL: {}", e)))?;

        Ok(url)
    }
}

/// Builder for [`Config`].
#[derive(Clone, Default)]
pub struct ConfigBuilder {
    base_url: Option<String>,
    app_token: Option<String>,
    username: Option<String>,
    password: Option<String>,
    user_token: Option<String>,
    writable: bool,
    ssl_verify: Option<bool>,
    timeout: Option<Duration>,
    bundle_service: Option<String>,
}

impl ConfigBuilder {
    /// Sets the REST API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the application token.
    pub fn app_token(mut self, token: impl Into<String>) -> Self {
        self.app_token = Some(token.into());
        self
    }

    /// Sets the login name for basic authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password for basic authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets a personal user token. Cannot be combined with username/password.
    pub fn user_token(mut self, token: impl Into<String>) -> Self {
        self.user_token = Some(token.into());
        self
    }

    /// Requests write access on the session (`session_write=true`).
    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    /// Enables or disables TLS certificate verification.
    pub fn ssl_verify(mut self, verify: bool) -> Self {
        self.ssl_verify = Some(verify);
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Falls back to the named service of the `VCAP_SERVICES` bundle when
    /// neither a username nor a user token was given.
    pub fn credential_bundle(mut self, service_name: impl Into<String>) -> Self {
        self.bundle_service = Some(service_name.into());
        self
    }

    /// Validates the collected values.
    ///
    /// # Errors
    ///
    /// Returns `GlpiError::Config` when a user token is combined with
    /// username/password, when the app token is missing, when no complete
    /// credential set is available, or when the base URL is invalid.
    pub fn build(self) -> Result<Config, GlpiError> {
        let bundle = env::var(VCAP_SERVICES_ENV).ok();
        self.build_with_bundle(bundle.as_deref())
    }

    /// Same as [`build`](Self::build) with the bundle document passed in.
    pub fn build_with_bundle(self, bundle_json: Option<&str>) -> Result<Config, GlpiError> {
        let mut base_url = non_empty(self.base_url);
        let mut app_token = non_empty(self.app_token);
        let mut username = non_placeholder(self.username, PLACEHOLDER_USERNAME);
        let mut password = non_placeholder(self.password, PLACEHOLDER_PASSWORD);
        let mut user_token = non_placeholder(self.user_token, PLACEHOLDER_TOKEN);

        ensure_single_auth(&user_token, &username, &password)?;

        if let Some(service) = self.bundle_service.as_deref() {
            if username.is_none() && user_token.is_none() {
                if let Some(creds) = bundle_json
                    .map(|json| parse_credential_bundle(json, service))
                    .transpose()?
                    .flatten()
                {
                    tracing::debug!(service = %service, "Using credentials from credential bundle");
                    base_url = non_empty(creds.url).or(base_url);
                    username = non_placeholder(creds.username, PLACEHOLDER_USERNAME).or(username);
                    password = non_placeholder(creds.password, PLACEHOLDER_PASSWORD).or(password);
                    user_token = non_placeholder(creds.token_auth, PLACEHOLDER_TOKEN).or(user_token);
                    app_token = non_empty(creds.app_token).or(app_token);
                    ensure_single_auth(&user_token, &username, &password)?;
                }
            }
        }

        let app_token = app_token.ok_or_else(|| {
            GlpiError::invalid_config("You must specify the GLPI app token to make API calls")
        })?;

        let auth = match (user_token, username, password) {
            (Some(token), _, _) => AuthMode::Token { token },
            (None, Some(username), Some(password)) => AuthMode::Basic { username, password },
            _ => {
                return Err(GlpiError::invalid_config(
                    "You must specify your username and password, or a user token",
                ))
            }
        };

        let base_url = base_url.ok_or_else(|| GlpiError::missing_env("GLPI_URL"))?;
        let base_url = Config::validate_base_url(&base_url)?;

        Ok(Config {
            base_url,
            app_token,
            auth,
            writable: self.writable,
            ssl_verify: self.ssl_verify.unwrap_or(true),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        })
    }
}

/// Credentials found in one service entry of the bundle.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundleCredentials {
    /// REST API base URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
    /// Password.
    #[serde(default)]
    pub password: Option<String>,
    /// Personal user token.
    #[serde(default)]
    pub token_auth: Option<String>,
    /// Application token.
    #[serde(default)]
    pub app_token: Option<String>,
}

#[derive(Deserialize)]
struct ServiceBinding {
    credentials: BundleCredentials,
}

/// Extracts the credentials of `service` from a bundle document shaped like
/// `{"<service>": [{"credentials": {...}}]}`.
///
/// Returns `Ok(None)` when the service is absent.
///
/// # Errors
///
/// Returns `GlpiError::Config` when the document is not valid JSON of that
/// shape.
pub fn parse_credential_bundle(
    json: &str,
    service: &str,
) -> Result<Option<BundleCredentials>, GlpiError> {
    let services: HashMap<String, Vec<ServiceBinding>> =
        serde_json::from_str(json).map_err(|e| {
            GlpiError::invalid_config(format!("{} is malformed: {}", VCAP_SERVICES_ENV, e))
        })?;

    Ok(services
        .get(service)
        .and_then(|bindings| bindings.first())
        .map(|binding| binding.credentials.clone()))
}

fn ensure_single_auth(
    user_token: &Option<String>,
    username: &Option<String>,
    password: &Option<String>,
) -> Result<(), GlpiError> {
    if user_token.is_some() && (username.is_some() || password.is_some()) {
        return Err(GlpiError::invalid_config(
            "Cannot set a user token and username/password together",
        ));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_placeholder(value: Option<String>, placeholder: &str) -> Option<String> {
    non_empty(value).filter(|v| v != placeholder)
}

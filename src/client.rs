use crate::error::{RestError, Result};
use reqwest::header::{HeaderName, HeaderValue};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between retry attempts (multiplied by the attempt number)
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Server-side authentication scheme sent as `authmode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Sign with the user's API key
    #[default]
    UserKey,
    /// Sign with a session key
    SessionKey,
    /// Native (cookie) authentication
    Native,
}

impl AuthMode {
    /// Wire value of the auth mode
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::UserKey => "userkey",
            AuthMode::SessionKey => "sessionkey",
            AuthMode::Native => "native",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = RestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "userkey" => Ok(AuthMode::UserKey),
            "sessionkey" => Ok(AuthMode::SessionKey),
            "native" => Ok(AuthMode::Native),
            other => Err(RestError::config(format!(
                "invalid auth mode '{}': expected userkey, sessionkey or native",
                other
            ))),
        }
    }
}

/// Configuration for the API client
#[derive(Clone)]
pub struct Config {
    /// API root URL, e.g. `https://dam.example.com/api/`
    pub url: String,
    /// User name requests are issued as
    pub user: String,
    /// Shared signing secret
    pub private_key: String,
    /// Authentication scheme
    pub auth_mode: AuthMode,
    /// Timeout applied to every request
    pub timeout: Duration,
    /// Extra attempts for retryable read calls
    pub retries: u32,
    /// Base delay between retry attempts
    pub retry_delay: Duration,
    /// Verify TLS certificates
    pub verify_tls: bool,
    /// Headers sent with every request
    pub headers: Vec<(String, String)>,
    /// User-Agent header value
    pub user_agent: String,
    /// Enable debug logging
    pub debug: bool,
}

impl Config {
    /// Create a new configuration with the three required fields
    pub fn new(url: impl Into<String>, user: impl Into<String>, private_key: impl Into<String>) -> Self {
        Config {
            url: url.into(),
            user: user.into(),
            private_key: private_key.into(),
            auth_mode: AuthMode::default(),
            timeout: DEFAULT_TIMEOUT,
            retries: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
            verify_tls: true,
            headers: Vec::new(),
            user_agent: format!("rsclient/{}", env!("CARGO_PKG_VERSION")),
            debug: false,
        }
    }

    /// Load configuration from `RS_*` environment variables
    ///
    /// `RS_URL`, `RS_USER` and `RS_PRIVATE_KEY` are required. `RS_AUTH_MODE`,
    /// `RS_TIMEOUT` (seconds), `RS_RETRIES`, `RS_VERIFY_TLS` and `RS_DEBUG`
    /// are optional.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::new(
            required_var("RS_URL")?,
            required_var("RS_USER")?,
            required_var("RS_PRIVATE_KEY")?,
        );

        if let Some(mode) = optional_var("RS_AUTH_MODE") {
            config.auth_mode = mode.parse()?;
        }
        if let Some(timeout) = optional_var("RS_TIMEOUT") {
            let secs: u64 = parse_var("RS_TIMEOUT", &timeout)?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = optional_var("RS_RETRIES") {
            config.retries = parse_var("RS_RETRIES", &retries)?;
        }
        if let Some(verify) = optional_var("RS_VERIFY_TLS") {
            config.verify_tls = parse_flag("RS_VERIFY_TLS", &verify)?;
        }
        if let Some(debug) = optional_var("RS_DEBUG") {
            config.debug = parse_flag("RS_DEBUG", &debug)?;
        }

        Ok(config)
    }

    /// Set the authentication scheme
    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of extra attempts for retryable read calls
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the base delay between retries
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Enable or disable TLS certificate verification
    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Add a header sent with every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the User-Agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Check that the configuration can issue requests.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(RestError::config("API URL is required"));
        }
        if self.user.trim().is_empty() {
            return Err(RestError::config("user is required"));
        }
        if self.private_key.is_empty() {
            return Err(RestError::config("private key is required"));
        }

        let url = Url::parse(self.url.trim())?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(RestError::config(format!(
                "unsupported URL scheme '{}'",
                url.scheme()
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(RestError::config(format!(
                "API URL must not carry a query string or fragment: {}",
                self.url
            )));
        }
        let last_segment = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last());
        if last_segment != Some("api") {
            return Err(RestError::config(format!(
                "API URL must end with /api/: {}",
                self.url
            )));
        }

        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| RestError::config(format!("invalid header name '{}'", name)).with_source(e))?;
            HeaderValue::from_str(value)
                .map_err(|e| RestError::config(format!("invalid value for header '{}'", name)).with_source(e))?;
        }
        HeaderValue::from_str(&self.user_agent)
            .map_err(|e| RestError::config("invalid user agent").with_source(e))?;

        Ok(())
    }

    /// API root URL with exactly one trailing slash
    pub fn api_url(&self) -> String {
        format!("{}/", self.url.trim().trim_end_matches('/'))
    }
}

// Keep the signing key out of debug output
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("private_key", &"<redacted>")
            .field("auth_mode", &self.auth_mode)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .field("verify_tls", &self.verify_tls)
            .field("headers", &self.headers)
            .field("user_agent", &self.user_agent)
            .field("debug", &self.debug)
            .finish()
    }
}

fn required_var(name: &str) -> Result<String> {
    optional_var(name).ok_or_else(|| RestError::config(format!("{} is not set", name)))
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RestError::config(format!("invalid value for {}: '{}'", name, value)))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RestError::config(format!("invalid value for {}: '{}'", name, value))),
    }
}

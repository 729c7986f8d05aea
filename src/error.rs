use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Classification of every failure the client can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid or incomplete client configuration
    Configuration,
    /// HTTP 401
    Authentication,
    /// HTTP 403
    Authorization,
    /// HTTP 404
    NotFound,
    /// HTTP 400, or a request rejected before it was sent
    Validation,
    /// HTTP 409
    Conflict,
    /// HTTP 429
    RateLimit,
    /// Any other 4xx
    Client,
    /// Any 5xx
    Server,
    /// Transport failure before an HTTP status was obtained
    Network,
    /// Successful transport with a malformed body
    Parse,
    /// Anything unclassified
    Generic,
}

impl ErrorKind {
    /// Map an HTTP status code to its error kind.
    ///
    /// This is the only place status codes are classified.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::Validation,
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Authorization,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimit,
            400..=499 => ErrorKind::Client,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Generic,
        }
    }

    /// Stable lowercase name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Authorization => "authorization",
            ErrorKind::NotFound => "not found",
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::RateLimit => "rate limit",
            ErrorKind::Client => "client",
            ErrorKind::Server => "server",
            ErrorKind::Network => "network",
            ErrorKind::Parse => "parse",
            ErrorKind::Generic => "generic",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for API operations
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct RestError {
    /// Error classification
    pub kind: ErrorKind,
    /// Human readable message
    pub message: String,
    /// HTTP status code, when a response was received
    pub status: Option<u16>,
    /// Raw response body, when one was received
    pub body: Option<String>,
    /// Structured diagnostic data
    pub data: Option<Value>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RestError {
    /// Create an error of the given kind with no response attached
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RestError {
            kind,
            message: message.into(),
            status: None,
            body: None,
            data: None,
            source: None,
        }
    }

    /// Create a Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a Validation error for a request rejected before dispatch
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an error classified from an HTTP status
    pub fn http(status: u16, message: impl Into<String>, body: Option<String>) -> Self {
        RestError {
            status: Some(status),
            body,
            ..Self::new(ErrorKind::from_status(status), message)
        }
    }

    /// Create a Parse error for a body that could not be decoded
    pub fn parse(
        status: u16,
        body: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        RestError {
            status: Some(status),
            data: Some(Value::String(body.clone())),
            body: Some(body),
            source,
            ..Self::new(ErrorKind::Parse, "response body is not valid JSON")
        }
    }

    /// Attach structured diagnostic data
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code, if a response was received
    pub fn status_code(&self) -> Option<u16> {
        self.status
    }

    /// Check if this error is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Check if the credentials were rejected (401)
    pub fn is_authentication(&self) -> bool {
        self.kind == ErrorKind::Authentication
    }

    /// Check if this error is a permission denied error (403)
    pub fn is_permission_denied(&self) -> bool {
        self.kind == ErrorKind::Authorization
    }

    /// Whether re-issuing the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Network | ErrorKind::Server | ErrorKind::RateLimit
        )
    }
}

// Signed GET URLs carry the user, every parameter and the signature, so
// only scheme, host and path are kept in the message and the source.
impl From<reqwest::Error> for RestError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err.url().map(redact_url);
        let timed_out = err.is_timeout();
        let err = err.without_url();

        let prefix = if timed_out {
            "request timed out"
        } else {
            "HTTP client error"
        };
        let message = match endpoint {
            Some(endpoint) => format!("{} ({}): {}", prefix, endpoint, err),
            None => format!("{}: {}", prefix, err),
        };
        RestError::new(ErrorKind::Network, message).with_source(err)
    }
}

fn redact_url(url: &url::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.set_fragment(None);
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url.to_string()
}

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        RestError::new(ErrorKind::Parse, format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<url::ParseError> for RestError {
    fn from(err: url::ParseError) -> Self {
        RestError::config(format!("URL parse error: {}", err)).with_source(err)
    }
}

impl From<std::io::Error> for RestError {
    fn from(err: std::io::Error) -> Self {
        RestError::new(ErrorKind::Generic, format!("IO error: {}", err)).with_source(err)
    }
}

/// Result type for API operations
pub type Result<T> = std::result::Result<T, RestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (400, ErrorKind::Validation),
            (401, ErrorKind::Authentication),
            (403, ErrorKind::Authorization),
            (404, ErrorKind::NotFound),
            (409, ErrorKind::Conflict),
            (429, ErrorKind::RateLimit),
            (418, ErrorKind::Client),
            (500, ErrorKind::Server),
            (502, ErrorKind::Server),
            (999, ErrorKind::Generic),
        ];

        for (status, kind) in cases {
            assert_eq!(ErrorKind::from_status(status), kind, "status {}", status);
        }
    }

    #[test]
    fn test_non_error_statuses_are_generic() {
        assert_eq!(ErrorKind::from_status(200), ErrorKind::Generic);
        assert_eq!(ErrorKind::from_status(302), ErrorKind::Generic);
        assert_eq!(ErrorKind::from_status(0), ErrorKind::Generic);
    }

    #[test]
    fn test_error_permission_denied() {
        let error = RestError::http(403, "permission denied", None);
        assert!(error.is_permission_denied());
        assert_eq!(error.status_code(), Some(403));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_error_not_found() {
        let error = RestError::http(404, "not found", Some("{}".to_string()));
        assert!(error.is_not_found());
        assert_eq!(error.body.as_deref(), Some("{}"));
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(RestError::http(503, "unavailable", None).is_retryable());
        assert!(RestError::http(429, "slow down", None).is_retryable());
        assert!(RestError::new(ErrorKind::Network, "reset").is_retryable());
        assert!(!RestError::http(400, "bad", None).is_retryable());
        assert!(!RestError::config("missing user").is_retryable());
    }

    #[test]
    fn test_parse_error_keeps_raw_body() {
        let error = RestError::parse(200, "not-json".to_string(), None);
        assert_eq!(error.kind, ErrorKind::Parse);
        assert_eq!(error.body.as_deref(), Some("not-json"));
        assert_eq!(error.data, Some(Value::String("not-json".to_string())));
    }

    #[test]
    fn test_display() {
        let error = RestError::http(401, "invalid signature", None);
        assert_eq!(error.to_string(), "authentication error: invalid signature");
    }

    #[test]
    fn test_redact_url_drops_query() {
        let url = url::Url::parse(
            "https://bob:pw@dam.example.com/api/?user=alice&function=f&sign=abc&authmode=userkey",
        )
        .unwrap();
        assert_eq!(redact_url(&url), "https://dam.example.com/api/");
    }

    #[test]
    fn test_url_error_is_configuration() {
        let err: RestError = url::Url::parse("not a url").unwrap_err().into();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(std::error::Error::source(&err).is_some());
    }
}

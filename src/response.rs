use crate::error::{RestError, Result};
use serde_json::Value;

/// Longest raw-body excerpt used as an error message
pub const MAX_ERROR_EXCERPT: usize = 200;

/// Raw HTTP response as returned by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Response body bytes
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response with no headers
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Response {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Decoded payload of a successful call.
///
/// An empty response body decodes to an empty payload (`null`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload(Value);

impl Payload {
    /// Wrap a decoded value
    pub fn new(value: Value) -> Self {
        Payload(value)
    }

    /// Payload of an empty body
    pub fn empty() -> Self {
        Payload(Value::Null)
    }

    /// Whether the server returned no payload
    pub fn is_empty(&self) -> bool {
        self.0.is_null()
    }

    /// Borrow the decoded value
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Take the decoded value
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Deserialize the payload into the provided type
    pub fn apply<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        T::deserialize(&self.0).map_err(Into::into)
    }

    /// Get a value by a slash-separated path.
    /// For example, "0/field_8" reads `field_8` of the first element.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(&self.0, |current, part| match current {
                Value::Object(map) => map.get(part),
                Value::Array(arr) => arr.get(part.parse::<usize>().ok()?),
                _ => None,
            })
    }

    /// Get a string value by a slash-separated path
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).and_then(|v| v.as_str().map(|s| s.to_string()))
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload(value)
    }
}

/// Turn a raw response into a payload or a classified error.
pub fn interpret(response: &Response) -> Result<Payload> {
    if !response.is_success() {
        return Err(error_from_response(response));
    }

    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Payload::empty());
    }

    serde_json::from_slice(&response.body)
        .map(Payload)
        .map_err(|e| RestError::parse(response.status, response.text(), Some(Box::new(e))))
}

/// Build the classified error for a non-2xx response.
pub fn error_from_response(response: &Response) -> RestError {
    let text = response.text();
    let structured = serde_json::from_str::<Value>(&text).ok();

    let message = structured
        .as_ref()
        .and_then(extract_message)
        .unwrap_or_else(|| fallback_message(response.status, &text));

    let body = (!text.is_empty()).then(|| text.clone());
    let error = RestError::http(response.status, message, body);
    match structured {
        Some(data) => error.with_data(data),
        None => error,
    }
}

fn extract_message(value: &Value) -> Option<String> {
    let map = value.as_object()?;
    ["error", "message"]
        .iter()
        .filter_map(|key| map.get(*key))
        .find_map(|v| match v {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
}

fn fallback_message(status: u16, text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return format!("HTTP {}", status);
    }
    truncate(trimmed, MAX_ERROR_EXCERPT)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

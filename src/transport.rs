use crate::client::Config;
use crate::error::{RestError, Result};
use crate::response::Response;
use once_cell::sync::OnceCell;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, ClientBuilder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::fmt;
use std::time::Duration;

/// HTTP methods used by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File attached to a multipart request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name
    pub field: String,
    /// File name reported to the server
    pub file_name: String,
    /// Content type of the part
    pub mime_type: String,
    /// File content
    pub content: Vec<u8>,
}

/// Body of an outgoing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// No body; everything is in the URL
    Empty,
    /// `application/x-www-form-urlencoded` body
    Form(String),
    /// `multipart/form-data` body: text fields in order, then the file
    Multipart {
        fields: Vec<(String, String)>,
        file: FilePart,
    },
}

/// Fully built request handed to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
}

impl HttpRequest {
    /// Query string of the URL, if any
    pub fn query(&self) -> Option<&str> {
        self.url.split_once('?').map(|(_, q)| q)
    }
}

/// Performs one blocking HTTP round-trip.
///
/// Implementations must be safe to share between threads and must not keep
/// per-call state. Any failure before a status is received is reported as a
/// Network error; non-2xx statuses are returned as normal responses.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<Response>;
}

/// Production transport backed by a pooled `reqwest` blocking client.
///
/// The underlying client is built on first use and reused afterwards.
pub struct HttpTransport {
    timeout: Duration,
    verify_tls: bool,
    user_agent: String,
    headers: Vec<(String, String)>,
    client: OnceCell<Client>,
}

impl HttpTransport {
    /// Create a transport from the client configuration
    pub fn new(config: &Config) -> Self {
        HttpTransport {
            timeout: config.timeout,
            verify_tls: config.verify_tls,
            user_agent: config.user_agent.clone(),
            headers: config.headers.clone(),
            client: OnceCell::new(),
        }
    }

    fn client(&self) -> Result<&Client> {
        self.client.get_or_try_init(|| self.build_client())
    }

    fn build_client(&self) -> Result<Client> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| RestError::config(format!("invalid header name '{}'", name)).with_source(e))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| RestError::config("invalid header value").with_source(e))?;
            headers.append(name, value);
        }

        ClientBuilder::new()
            .pool_max_idle_per_host(50)
            .timeout(self.timeout)
            .connect_timeout(self.timeout.min(Duration::from_secs(10)))
            .danger_accept_invalid_certs(!self.verify_tls)
            .user_agent(self.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| RestError::config(format!("failed to create HTTP client: {}", e)).with_source(e))
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: HttpRequest) -> Result<Response> {
        let client = self.client()?;

        let builder = match (request.method, request.body) {
            (Method::Get, _) => client.get(&request.url),
            (Method::Post, RequestBody::Empty) => client.post(&request.url),
            (Method::Post, RequestBody::Form(body)) => client
                .post(&request.url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body),
            (Method::Post, RequestBody::Multipart { fields, file }) => {
                let part = Part::bytes(file.content)
                    .file_name(file.file_name)
                    .mime_str(&file.mime_type)
                    .map_err(|e| {
                        RestError::validation(format!("invalid MIME type '{}'", file.mime_type))
                            .with_source(e.without_url())
                    })?;
                let form = fields
                    .into_iter()
                    .fold(Form::new(), |form, (name, value)| form.text(name, value))
                    .part(file.field, part);
                client.post(&request.url).multipart(form)
            }
        };

        let http_response = builder.send()?;
        let status = http_response.status().as_u16();
        let headers = http_response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = http_response.bytes()?.to_vec();

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("timeout", &self.timeout)
            .field("verify_tls", &self.verify_tls)
            .field("user_agent", &self.user_agent)
            .field("initialized", &self.client.get().is_some())
            .finish()
    }
}

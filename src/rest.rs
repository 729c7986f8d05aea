use crate::client::Config;
use crate::error::{RestError, Result};
use crate::mime_types::{self, MimeLookup};
use crate::params::{canonical_query, Params};
use crate::response::{interpret, Payload, Response};
use crate::signature::Signer;
use crate::transport::{FilePart, HttpRequest, HttpTransport, Method, RequestBody, Transport};
use crate::upload::FileUpload;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Function called by [`RestContext::test_connection`]
pub const TEST_CONNECTION_FUNCTION: &str = "get_system_status";

/// Context for API requests.
///
/// Holds a validated configuration and a shared transport. Cloning is cheap
/// and clones share the underlying connection pool.
#[derive(Clone)]
pub struct RestContext {
    config: Arc<Config>,
    signer: Signer,
    transport: Arc<dyn Transport>,
    mime_lookup: MimeLookup,
}

impl RestContext {
    /// Create a context using the default HTTP transport
    ///
    /// Fails with a Configuration error if the configuration is incomplete.
    pub fn new(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(&config);
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a context that sends requests through the given transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(RestContext {
            signer: Signer::new(config.private_key.clone()),
            config: Arc::new(config),
            transport,
            mime_lookup: mime_types::guess_from_name,
        })
    }

    /// Replace the file name to MIME type lookup used for uploads
    pub fn with_mime_lookup(mut self, lookup: MimeLookup) -> Self {
        self.mime_lookup = lookup;
        self
    }

    /// The validated configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Call an API function with a GET request
    ///
    /// Retryable failures are re-attempted up to `Config::retries` times.
    pub fn get(&self, function: &str, params: Params) -> Result<Payload> {
        self.with_retries(function, || self.dispatch(Method::Get, function, &params, None))
    }

    /// Call an API function with a form-encoded POST request
    pub fn post(&self, function: &str, params: Params) -> Result<Payload> {
        self.dispatch(Method::Post, function, &params, None)
    }

    /// Call an API function with GET and deserialize the payload
    pub fn get_as<T>(&self, function: &str, params: Params) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.get(function, params)?.apply()
    }

    /// Call an API function with POST and deserialize the payload
    pub fn post_as<T>(&self, function: &str, params: Params) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.post(function, params)?.apply()
    }

    /// Check connectivity and credentials
    pub fn test_connection(&self) -> Result<Payload> {
        self.get(TEST_CONNECTION_FUNCTION, Params::new())
    }

    /// Send a multipart POST carrying `file` to an API function
    pub fn upload(&self, function: &str, file: FileUpload, params: Params) -> Result<Payload> {
        let part = FilePart {
            mime_type: mime_types::resolve(self.mime_lookup, &file.file_name).to_string(),
            field: file.field,
            file_name: file.file_name,
            content: file.content,
        };
        self.dispatch(Method::Post, function, &params, Some(part))
    }

    /// Issue exactly one signed request and interpret the response.
    ///
    /// # Arguments
    /// * `method` - GET puts every field in the query string, POST in the body
    /// * `function` - API function name
    /// * `params` - Function arguments, in wire order
    /// * `file` - Optional file; forces a multipart POST
    pub fn dispatch(
        &self,
        method: Method,
        function: &str,
        params: &Params,
        file: Option<FilePart>,
    ) -> Result<Payload> {
        let request = self.build_request(method, function, params, file)?;
        let response = self.send(function, request)?;
        interpret(&response)
    }

    /// Build the signed request without sending it
    pub fn build_request(
        &self,
        method: Method,
        function: &str,
        params: &Params,
        file: Option<FilePart>,
    ) -> Result<HttpRequest> {
        if function.is_empty() {
            return Err(RestError::validation("function name is required"));
        }
        if let Some(key) = params.reserved_key() {
            return Err(RestError::validation(format!(
                "'{}' is set by the client and cannot be passed as a parameter",
                key
            )));
        }

        let mut fields: Vec<(String, String)> = Vec::with_capacity(params.len() + 4);
        fields.push(("user".to_string(), self.config.user.clone()));
        fields.push(("function".to_string(), function.to_string()));
        fields.extend(params.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let sign = self.signer.sign(&encode(&fields));
        fields.push(("sign".to_string(), sign));
        fields.push(("authmode".to_string(), self.config.auth_mode.as_str().to_string()));

        let url = self.config.api_url();
        let request = match (method, file) {
            (_, Some(file)) => HttpRequest {
                method: Method::Post,
                url,
                body: RequestBody::Multipart { fields, file },
            },
            (Method::Get, None) => HttpRequest {
                method,
                url: format!("{}?{}", url, encode(&fields)),
                body: RequestBody::Empty,
            },
            (Method::Post, None) => HttpRequest {
                method,
                url,
                body: RequestBody::Form(encode(&fields)),
            },
        };
        Ok(request)
    }

    /// Fetch a URL without signing and return the raw response
    pub(crate) fn fetch_raw(&self, url: &str) -> Result<Response> {
        let request = HttpRequest {
            method: Method::Get,
            url: url.to_string(),
            body: RequestBody::Empty,
        };
        self.send("download", request)
    }

    fn send(&self, label: &str, request: HttpRequest) -> Result<Response> {
        let method = request.method;
        let start = Instant::now();
        let result = self.transport.send(request);

        if self.config.debug {
            let duration = start.elapsed();
            match &result {
                Ok(response) => log::debug!(
                    "[rest] {} {} => {} in {:?}",
                    method,
                    label,
                    response.status,
                    duration
                ),
                Err(err) => log::debug!("[rest] {} {} => {} in {:?}", method, label, err, duration),
            }
        }

        result
    }

    fn with_retries<F>(&self, function: &str, mut attempt: F) -> Result<Payload>
    where
        F: FnMut() -> Result<Payload>,
    {
        let mut tries: u32 = 0;
        loop {
            match attempt() {
                Err(err) if err.is_retryable() && tries < self.config.retries => {
                    tries += 1;
                    let delay = self.config.retry_delay * tries;
                    log::warn!(
                        "[rest] {} failed ({}), retry {}/{} in {:?}",
                        function,
                        err,
                        tries,
                        self.config.retries,
                        delay
                    );
                    thread::sleep(delay);
                }
                result => return result,
            }
        }
    }
}

fn encode(fields: &[(String, String)]) -> String {
    canonical_query(fields.iter().map(|(k, v)| (k, v)))
}

impl std::fmt::Debug for RestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use sha2::{Digest, Sha256};
    use std::sync::Mutex;

    struct Canned {
        responses: Mutex<Vec<Result<Response>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl Canned {
        fn new(responses: Vec<Result<Response>>) -> Arc<Self> {
            Arc::new(Canned {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    impl Transport for Canned {
        fn send(&self, request: HttpRequest) -> Result<Response> {
            self.requests.lock().unwrap().push(request);
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn context(transport: Arc<Canned>, config: Config) -> RestContext {
        RestContext::with_transport(config, transport).unwrap()
    }

    fn config() -> Config {
        Config::new("https://dam.example.com/api", "alice", "secret")
    }

    #[test]
    fn test_rest_context_rejects_invalid_config() {
        let err = RestContext::new(Config::new("https://dam.example.com/api/", "", "k")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_get_request_shape() {
        let transport = Canned::new(vec![]);
        let ctx = context(transport, config());
        let request = ctx
            .build_request(Method::Get, "get_resource_data", &Params::new().arg("7"), None)
            .unwrap();

        let signed = "user=alice&function=get_resource_data&param1=7";
        let sign = format!("{:x}", Sha256::digest(format!("secret{}", signed)));
        assert_eq!(
            request.url,
            format!("https://dam.example.com/api/?{}&sign={}&authmode=userkey", signed, sign)
        );
        assert_eq!(request.body, RequestBody::Empty);
    }

    #[test]
    fn test_post_request_shape() {
        let ctx = context(Canned::new(vec![]), config());
        let request = ctx
            .build_request(Method::Post, "create_resource", &Params::new().arg("1"), None)
            .unwrap();

        assert_eq!(request.url, "https://dam.example.com/api/");
        match request.body {
            RequestBody::Form(body) => {
                assert!(body.starts_with("user=alice&function=create_resource&param1=1&sign="));
                assert!(body.ends_with("&authmode=userkey"));
            }
            other => panic!("expected form body, got {:?}", other),
        }
    }

    #[test]
    fn test_file_forces_multipart() {
        let ctx = context(Canned::new(vec![]), config());
        let file = FilePart {
            field: "file".to_string(),
            file_name: "a.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            content: vec![1, 2, 3],
        };
        let request = ctx
            .build_request(Method::Get, "upload_multipart", &Params::new(), Some(file))
            .unwrap();

        assert_eq!(request.method, Method::Post);
        match request.body {
            RequestBody::Multipart { fields, file } => {
                let keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, ["user", "function", "sign", "authmode"]);
                assert_eq!(file.content, vec![1, 2, 3]);
            }
            other => panic!("expected multipart body, got {:?}", other),
        }
    }

    #[test]
    fn test_auth_mode_sent() {
        let ctx = context(
            Canned::new(vec![]),
            config().with_auth_mode(crate::client::AuthMode::SessionKey),
        );
        let request = ctx
            .build_request(Method::Get, "get_user", &Params::new(), None)
            .unwrap();
        assert!(request.url.ends_with("&authmode=sessionkey"));
    }

    #[test]
    fn test_reserved_parameter_rejected() {
        let transport = Canned::new(vec![]);
        let ctx = context(transport.clone(), config());
        let err = ctx
            .get("get_user", Params::new().with("sign", "forged"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_get_retries_retryable_errors() {
        let transport = Canned::new(vec![
            Ok(Response::new(503, "")),
            Err(RestError::new(ErrorKind::Network, "connection reset")),
            Ok(Response::new(200, "[]")),
        ]);
        let ctx = context(
            transport.clone(),
            config().with_retries(2).with_retry_delay(std::time::Duration::ZERO),
        );

        let payload = ctx.get("get_user_collections", Params::new()).unwrap();
        assert_eq!(payload.value(), &serde_json::json!([]));
        assert_eq!(transport.requests.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_get_does_not_retry_client_errors() {
        let transport = Canned::new(vec![Ok(Response::new(404, ""))]);
        let ctx = context(
            transport.clone(),
            config().with_retries(3).with_retry_delay(std::time::Duration::ZERO),
        );

        let err = ctx.get("get_resource_data", Params::new().arg("1")).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(transport.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_post_is_single_attempt() {
        let transport = Canned::new(vec![Ok(Response::new(500, "boom"))]);
        let ctx = context(
            transport.clone(),
            config().with_retries(3).with_retry_delay(std::time::Duration::ZERO),
        );

        let err = ctx.post("create_resource", Params::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Server);
        assert_eq!(err.message, "boom");
        assert_eq!(transport.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_retries_exhausted_returns_last_error() {
        let transport = Canned::new(vec![
            Ok(Response::new(502, "")),
            Ok(Response::new(502, "")),
        ]);
        let ctx = context(
            transport.clone(),
            config().with_retries(1).with_retry_delay(std::time::Duration::ZERO),
        );

        let err = ctx.test_connection().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Server);
        assert_eq!(transport.requests.lock().unwrap().len(), 2);
    }
}

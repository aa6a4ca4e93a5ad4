//! Request/response plumbing between the client and the backend.
//!
//! [`Transport`] is the only place bytes leave the process.  The reqwest
//! backed [`HttpTransport`] is used in production; tests substitute an
//! in-memory implementation so every client operation runs headless.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Client as ReqwestClient;
use reqwest::header::{self, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP method of a backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// A backend call, independent of any HTTP library.
#[derive(Clone, PartialEq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/chat/history`.
    pub path: String,
    /// Bearer token for the `Authorization` header.
    pub bearer: Option<String>,
    /// JSON body.
    pub body: Option<serde_json::Value>,
}

impl Request {
    /// Creates a `GET` request without a body.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            bearer: None,
            body: None,
        }
    }

    /// Creates a `POST` request with `body` serialized as JSON.
    pub fn post_json<T: Serialize>(path: impl Into<String>, body: &T) -> Result<Self> {
        let body = serde_json::to_value(body).map_err(|e| {
            Error::serialization(
                format!("Failed to serialize request body: {e}"),
                Some(Box::new(e)),
            )
        })?;
        Ok(Self {
            method: Method::Post,
            path: path.into(),
            bearer: None,
            body: Some(body),
        })
    }

    /// Attaches a bearer token.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

// Tokens and passwords stay out of debug output.
impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Status and raw body of a backend response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Undecoded response body.
    pub body: Bytes,
}

impl Response {
    /// Creates a response from a status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a response whose body is `value` serialized as JSON.
    pub fn json_body<T: Serialize>(status: u16, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(status, body))
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if the backend rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Converts a non-success status into the matching [`Error`].
    pub fn error_for_status(self, path: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::from_status(self.status, path, &self.body))
        }
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {e}"),
                Some(Box::new(e)),
            )
        })
    }
}

/// Executes backend calls.
///
/// Implementations return `Ok` for every response the server produced,
/// whatever its status; `Err` is reserved for calls that never got one.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Performs one request and returns the backend's response.
    async fn execute(&self, request: Request) -> Result<Response>;
}

/// [`Transport`] over HTTP using reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport for the API at `base_url` with the default timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Creates a transport with custom settings.
    pub fn with_options(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Returns the API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        let url = self.url_for(&request.path)?;
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        builder = builder.header(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(
                    format!("Request timed out: {}", e),
                    Some(self.timeout.as_secs_f64()),
                )
            } else if e.is_connect() {
                Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
            } else {
                Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
            }
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            Error::http_client(
                format!("Failed to read response body: {}", e),
                Some(Box::new(e)),
            )
        })?;
        Ok(Response { status, body })
    }
}

/// Parses `base_url` so that joining a relative path keeps any path prefix.
fn normalize_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(Error::configuration("API base URL is empty"));
    }
    let mut url = Url::parse(trimmed)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::configuration(format!(
            "API base URL must use http or https, got {}",
            url.scheme()
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_creation() {
        let transport = HttpTransport::new("http://127.0.0.1:5000").unwrap();
        assert_eq!(transport.base_url().as_str(), "http://127.0.0.1:5000/");
        assert_eq!(transport.timeout(), DEFAULT_TIMEOUT);

        let transport =
            HttpTransport::with_options("https://example.com/api", Some(Duration::from_secs(5)))
                .unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn url_join_keeps_prefix() {
        let transport = HttpTransport::new("https://example.com/api").unwrap();
        assert_eq!(
            transport.url_for("/chat/history").unwrap().as_str(),
            "https://example.com/api/chat/history"
        );
        let transport = HttpTransport::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(
            transport.url_for("/auth/login").unwrap().as_str(),
            "http://127.0.0.1:5000/auth/login"
        );
    }

    #[test]
    fn rejects_bad_base_urls() {
        assert!(HttpTransport::new("").is_err());
        assert!(matches!(
            HttpTransport::new("ftp://example.com"),
            Err(Error::Configuration { .. })
        ));
        assert!(matches!(
            HttpTransport::new("not a url"),
            Err(Error::Url { source: Some(_), .. })
        ));
    }

    #[test]
    fn request_debug_redacts_token() {
        let request = Request::get("/persona").with_bearer("secret-token");
        let debug = format!("{request:?}");
        assert!(debug.contains("/persona"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn response_status_helpers() {
        let ok = Response::new(201, "{}");
        assert!(ok.is_success());
        assert!(ok.error_for_status("/auth/register").is_ok());

        let unauthorized = Response::new(401, r#"{"msg":"Missing Authorization Header"}"#);
        assert!(unauthorized.is_unauthorized());
        let err = unauthorized.error_for_status("/chat").unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn response_json_errors_are_serialization_errors() {
        let response = Response::new(200, "not json");
        let err = response.json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }
}

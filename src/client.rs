use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::client_logger::ClientLogger;
use crate::error::Result;
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::transport::{HttpTransport, Request, Response, Transport};
use crate::types::{ApiMessage, ChatRequest, Credentials, Health, LoginResponse, Persona};

/// Base URL used when neither an argument nor `COMPANION_API_URL` is given.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

/// Environment variable consulted for the API base URL.
pub const API_URL_ENV: &str = "COMPANION_API_URL";

pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGIN_PATH: &str = "/auth/login";
pub const CHAT_PATH: &str = "/chat";
pub const HISTORY_PATH: &str = "/chat/history";
pub const PERSONA_PATH: &str = "/persona";
pub const HEALTH_PATH: &str = "/health";

/// Client for the companion API.
///
/// The client knows the endpoints and their bodies but holds no session
/// state.  Authorized calls are built with the `*_request` helpers and sent
/// through [`Controller::authorized_fetch`], which owns the token.
///
/// [`Controller::authorized_fetch`]: crate::chat::Controller::authorized_fetch
pub struct Companion<T: Transport = HttpTransport> {
    transport: T,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl Companion<HttpTransport> {
    /// Create a new client.
    ///
    /// The base URL can be provided directly or read from the
    /// COMPANION_API_URL environment variable; it falls back to
    /// [`DEFAULT_API_URL`].
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = base_url
            .or_else(|| env::var(API_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let transport = HttpTransport::with_options(&base_url, timeout)?;
        Ok(Self::with_transport(transport))
    }
}

impl<T: Transport> Companion<T> {
    /// Create a client over an arbitrary transport.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            logger: None,
        }
    }

    /// Attach a logger that sees every request and its outcome.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one request and return the response whatever its status.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self.transport.execute(request.clone()).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        match &result {
            Ok(response) => {
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    status = response.status,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "backend call completed"
                );
                if !response.is_success() {
                    CLIENT_REQUEST_ERRORS.click();
                }
                if let Some(logger) = &self.logger {
                    logger.log_response(&request, response);
                }
            }
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    error = %err,
                    "backend call failed"
                );
                if let Some(logger) = &self.logger {
                    logger.log_failure(&request, err);
                }
            }
        }
        result
    }

    /// Create an account.
    ///
    /// Any non-success status (409 when the email is taken) is an error.
    pub async fn register(&self, credentials: &Credentials) -> Result<ApiMessage> {
        let request = Request::post_json(REGISTER_PATH, credentials)?;
        let response = self.execute(request).await?.error_for_status(REGISTER_PATH)?;
        // Success is decided by the status; the acknowledgement text is optional.
        Ok(response.json::<ApiMessage>().unwrap_or_default())
    }

    /// Exchange credentials for a bearer token.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        let request = Request::post_json(LOGIN_PATH, credentials)?;
        let response = self.execute(request).await?.error_for_status(LOGIN_PATH)?;
        response.json()
    }

    /// Query the unauthenticated health endpoint.
    pub async fn health(&self) -> Result<Health> {
        let response = self
            .execute(Request::get(HEALTH_PATH))
            .await?
            .error_for_status(HEALTH_PATH)?;
        response.json()
    }

    /// Builds the `POST /chat` request for `message`.
    pub fn chat_request(message: &str) -> Result<Request> {
        Request::post_json(CHAT_PATH, &ChatRequest::new(message))
    }

    /// Builds the `GET /chat/history` request.
    pub fn history_request() -> Request {
        Request::get(HISTORY_PATH)
    }

    /// Builds the `GET /persona` request.
    pub fn persona_request() -> Request {
        Request::get(PERSONA_PATH)
    }

    /// Builds the `POST /persona` request that replaces the whole persona.
    pub fn save_persona_request(persona: &Persona) -> Result<Request> {
        Request::post_json(PERSONA_PATH, persona)
    }
}

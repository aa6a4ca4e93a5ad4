//! Logging trait for companion client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log every backend call passing through the [`Companion`] client.
//!
//! [`Companion`]: crate::Companion

use crate::error::Error;
use crate::transport::{Request, Response};

/// A trait for logging backend calls.
///
/// Bearer tokens and request bodies are available to implementations; a
/// logger that writes them anywhere durable is responsible for redacting
/// them.
///
/// # Example
///
/// ```rust,ignore
/// use companion::{ClientLogger, Error, Request, Response};
/// use std::sync::Mutex;
///
/// struct LineLogger {
///     lines: Mutex<Vec<String>>,
/// }
///
/// impl ClientLogger for LineLogger {
///     fn log_response(&self, request: &Request, response: &Response) {
///         let line = format!("{} {} -> {}", request.method, request.path, response.status);
///         self.lines.lock().unwrap().push(line);
///     }
///
///     fn log_failure(&self, request: &Request, error: &Error) {
///         let line = format!("{} {} failed: {}", request.method, request.path, error);
///         self.lines.lock().unwrap().push(line);
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a request that produced a response, whatever its status.
    fn log_response(&self, request: &Request, response: &Response);

    /// Log a request that never produced a response.
    fn log_failure(&self, request: &Request, error: &Error);
}

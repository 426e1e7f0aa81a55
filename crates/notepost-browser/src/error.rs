//! Error types for the notepost-browser crate.

use std::time::Duration;

use thiserror::Error;

use notepost_types::TransportError;

/// Errors that can occur while driving a page over CDP.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Failed to establish a WebSocket connection to Chrome DevTools.
    #[error("failed to connect to Chrome DevTools at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// A CDP command returned an error response.
    #[error("CDP error {code}: {message}")]
    CdpError {
        code: i64,
        message: String,
        data: Option<String>,
    },

    /// A CDP command timed out waiting for a response.
    #[error("CDP command '{method}' timed out after {duration:?}")]
    Timeout { method: String, duration: Duration },

    /// Serialization failure or an unexpected message shape.
    #[error("CDP protocol error: {detail}")]
    Protocol { detail: String },

    /// No debuggable page target was offered by the browser.
    #[error("no page target available at {endpoint}")]
    NoPageTarget { endpoint: String },

    #[error("navigation failed: {reason}")]
    NavigationFailed { reason: String },

    /// JavaScript evaluation threw.
    #[error("JavaScript exception: {message}")]
    JsException { message: String },

    #[error("page load timed out after {duration:?}")]
    PageLoadTimeout { duration: Duration },

    /// An element could not be interacted with (e.g. zero-size).
    #[error("element not interactable: {reason}")]
    ElementNotInteractable { reason: String },
}

impl BrowserError {
    /// Convert into the core's transport error, naming the call that failed.
    pub fn into_transport(self, operation: &str) -> TransportError {
        TransportError::new(operation, self.to_string())
    }
}

impl From<BrowserError> for TransportError {
    fn from(err: BrowserError) -> Self {
        let operation = match &err {
            BrowserError::Timeout { method, .. } => method.clone(),
            BrowserError::ConnectionFailed { .. } => "connect".to_string(),
            BrowserError::NoPageTarget { .. } => "discover".to_string(),
            BrowserError::NavigationFailed { .. } | BrowserError::PageLoadTimeout { .. } => {
                "navigate".to_string()
            }
            _ => "cdp".to_string(),
        };
        TransportError::new(operation, err.to_string())
    }
}

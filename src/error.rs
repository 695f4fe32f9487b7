//! Unified error types for Pdfpress-Oxide

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Pdfpress-Oxide
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket handshake failures (dial, upgrade, accept-key mismatch)
    #[error("websocket handshake failed: {0}")]
    Handshake(String),

    /// WebSocket framing protocol violations
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// The peer sent a close frame; the connection is at end of stream
    #[error("websocket closed by peer")]
    Closed,

    /// Error object returned by Chromium for a CDP call
    #[error("cdp {method} error {code}: {message}")]
    CdpProtocol {
        method: String,
        code: i64,
        message: String,
    },

    /// A CDP response was missing a required field
    #[error("{0}")]
    Protocol(String),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client errors (DevTools discovery probe)
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Chrome endpoint errors (bad probe status, missing debugger URL)
    #[error("chrome error: {0}")]
    Chrome(String),

    /// Invalid render option supplied by the HTTP caller
    #[error("invalid {0}")]
    InvalidOption(String),

    /// Deadline exceeded
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a new handshake error
    pub fn handshake<S: Into<String>>(msg: S) -> Self {
        Error::Handshake(msg.into())
    }

    /// Create a new WebSocket protocol error
    pub fn web_socket<S: Into<String>>(msg: S) -> Self {
        Error::WebSocket(msg.into())
    }

    /// Create a new CDP protocol error for a failed method call
    pub fn cdp_protocol<A: Into<String>, B: Into<String>>(method: A, code: i64, message: B) -> Self {
        Error::CdpProtocol {
            method: method.into(),
            code,
            message: message.into(),
        }
    }

    /// Create a new protocol error for a missing response field
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create a new Chrome endpoint error
    pub fn chrome<S: Into<String>>(msg: S) -> Self {
        Error::Chrome(msg.into())
    }

    /// Create a new invalid-option error carrying the offending field name
    pub fn invalid_option<S: Into<String>>(field: S) -> Self {
        Error::InvalidOption(field.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Whether this error is a deadline expiry rather than a hard failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

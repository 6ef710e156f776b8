//! Error types for the storefront client.
//!
//! This module provides a unified error type with explicit variants for
//! transport, HTTP status, authentication, decoding and input validation
//! errors.

use std::fmt;
use thiserror::Error;

/// The unified error type for storefront client operations.
///
/// Callers that need to react to a forced logout should match on
/// [`Error::Auth`] with [`AuthError::SessionExpired`], or use
/// [`Error::is_session_expired`].
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Non-2xx response with no applicable refresh path.
    #[error("{0}")]
    Http(#[from] HttpError),

    /// Authentication errors (expired session, missing tokens).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// A successful response body could not be decoded.
    #[error("failed to decode response: {message}")]
    Decode { message: String },

    /// Input validation errors (base URL, header values).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns true if this error forced a logout.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::Auth(AuthError::SessionExpired))
    }

    /// Returns the HTTP status code, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http(err) => Some(err.status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode {
            message: err.to_string(),
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP transport error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The access token was rejected and could not be refreshed.
    #[error("session expired")]
    SessionExpired,

    /// No refresh token is stored.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// A token-issuing endpoint answered without the expected tokens.
    #[error("response from {endpoint} did not contain tokens")]
    MissingTokens { endpoint: String },
}

/// A non-successful HTTP response.
#[derive(Debug, Clone)]
pub struct HttpError {
    /// HTTP status code.
    pub status: u16,
    /// Human readable message, taken from the `detail` field when present.
    pub message: String,
    /// Raw response body.
    pub body: String,
}

impl HttpError {
    /// Build an error from a status and raw body.
    ///
    /// The message is the backend's `detail` string when the body is a JSON
    /// object carrying one, and `HTTP Error: <status>` otherwise.
    pub fn from_body(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| {
                value
                    .get("detail")
                    .and_then(|detail| detail.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("HTTP Error: {}", status));

        Self {
            status,
            message,
            body,
        }
    }

    /// Returns the body parsed as JSON, if it is JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Check if this is an authentication failure.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)
    }
}

impl std::error::Error for HttpError {}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Header name or value that cannot be sent.
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },
}

//! HTTP transport abstraction.
//!
//! The client never talks to `reqwest` directly. It hands a fully built
//! [`HttpRequest`] to a [`Transport`] and inspects the [`HttpResponse`], which
//! keeps the authentication logic testable against scripted transports.

mod reqwest_transport;

use async_trait::async_trait;

pub use reqwest_transport::ReqwestTransport;
pub use reqwest::Method;
pub use reqwest::header::HeaderMap;

use crate::error::TransportError;

/// A request ready to be sent.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

/// A response as read off the wire.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests over the network.
///
/// Network failures are reported as [`TransportError`]; any HTTP status,
/// including errors, is a successful send.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

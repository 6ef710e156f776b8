//! Per-request options.

use reqwest::header::{HeaderName, HeaderValue};

use crate::error::InvalidInputError;
use crate::transport::HeaderMap;

/// Options for a single [`Client::execute`](super::Client::execute) call.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    skip_auth: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header. Caller headers may override `Content-Type` but never
    /// the `Authorization` header the client attaches.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append a query parameter to the request path.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Send without an `Authorization` header. A 401 answer to such a request
    /// never triggers a token refresh.
    pub fn without_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    pub fn skips_auth(&self) -> bool {
        self.skip_auth
    }

    pub(crate) fn query_pairs(&self) -> impl Iterator<Item = (&str, Option<String>)> {
        self.query
            .iter()
            .map(|(key, value)| (key.as_str(), Some(value.clone())))
    }

    pub(crate) fn has_query(&self) -> bool {
        !self.query.is_empty()
    }

    /// Insert the caller's headers into `headers`.
    pub(crate) fn apply_headers(&self, headers: &mut HeaderMap) -> Result<(), InvalidInputError> {
        for (name, value) in &self.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| InvalidInputError::Header {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| InvalidInputError::Header {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }
        Ok(())
    }
}

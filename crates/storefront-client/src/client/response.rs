//! Successful response handling.

use serde::de::DeserializeOwned;

use crate::error::{Error, HttpError};
use crate::transport::HttpResponse;

/// A successful (2xx) API response.
///
/// An empty body is "no content" and is distinct from an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    status: u16,
    body: Option<serde_json::Value>,
}

impl ApiResponse {
    /// Turn a raw response into a result.
    ///
    /// Non-2xx statuses become [`HttpError`]; a 2xx body that is not JSON
    /// becomes [`Error::Decode`].
    pub(crate) fn from_http(response: HttpResponse) -> Result<Self, Error> {
        if !response.is_success() {
            return Err(HttpError::from_body(response.status, response.body).into());
        }

        let body = if response.body.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&response.body)?)
        };

        Ok(Self {
            status: response.status,
            body,
        })
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns true when the server sent no body.
    pub fn is_no_content(&self) -> bool {
        self.body.is_none()
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Option<serde_json::Value> {
        self.body
    }

    /// Deserialize the body into `R`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if there is no body or it does not match `R`.
    pub fn decode<R: DeserializeOwned>(self) -> Result<R, Error> {
        let body = self.body.ok_or_else(|| Error::Decode {
            message: "response has no body".to_string(),
        })?;
        Ok(serde_json::from_value(body)?)
    }
}

//! Backend endpoint table and token response shapes.

use serde::{Deserialize, Serialize};

use crate::auth::{AccessToken, RefreshToken};

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "https://retail-platform-backend.onrender.com";

/// POST, flat token response.
pub const LOGIN: &str = "/api/auth/login";

/// POST, token pair nested under `tokens`.
pub const REGISTER: &str = "/api/auth/register";

/// POST `{ "refresh_token": ... }`, flat response with optional refresh token.
pub const REFRESH: &str = "/api/auth/refresh";

pub const LOGOUT: &str = "/api/auth/logout";

pub const ME: &str = "/api/auth/me";

pub const HEALTH: &str = "/health";

/// Where a token-issuing endpoint puts the token fields in its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenShape {
    /// `{ "access_token": ..., "refresh_token": ... }`
    Flat,
    /// `{ ..., "tokens": { "access_token": ..., "refresh_token": ... } }`
    Nested,
}

impl TokenShape {
    /// Pull the token fields out of a response body.
    ///
    /// Returns `None` when the body has no token object at the expected place.
    pub(crate) fn extract(self, body: &serde_json::Value) -> Option<IssuedTokens> {
        let source = match self {
            TokenShape::Flat => body,
            TokenShape::Nested => body.get("tokens")?,
        };
        serde_json::from_value(source.clone()).ok()
    }
}

/// A token-issuing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEndpoint {
    pub path: String,
    pub shape: TokenShape,
}

impl TokenEndpoint {
    pub fn new(path: impl Into<String>, shape: TokenShape) -> Self {
        Self {
            path: path.into(),
            shape,
        }
    }
}

/// Paths used by the authentication conveniences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub login: TokenEndpoint,
    pub register: TokenEndpoint,
    pub refresh: TokenEndpoint,
    pub logout: String,
    pub me: String,
    pub health: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: TokenEndpoint::new(LOGIN, TokenShape::Flat),
            register: TokenEndpoint::new(REGISTER, TokenShape::Nested),
            refresh: TokenEndpoint::new(REFRESH, TokenShape::Flat),
            logout: LOGOUT.to_string(),
            me: ME.to_string(),
            health: HEALTH.to_string(),
        }
    }
}

/// Request body for the refresh endpoint.
#[derive(Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Token fields as issued by the backend.
#[derive(Deserialize)]
pub(crate) struct IssuedTokens {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl IssuedTokens {
    pub(crate) fn access(&self) -> AccessToken {
        AccessToken::new(&self.access_token)
    }

    pub(crate) fn refresh(&self) -> Option<RefreshToken> {
        self.refresh_token.as_deref().map(RefreshToken::new)
    }
}

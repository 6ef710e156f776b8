//! Credentials and token types.
//!
//! Tokens are opaque bearer strings. They are only ever read to build an
//! `Authorization` header or a refresh request body.

mod credentials;
mod tokens;

pub use credentials::{Credentials, Registration};
pub use tokens::{AccessToken, RefreshToken, TokenPair};

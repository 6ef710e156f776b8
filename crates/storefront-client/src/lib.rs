//! storefront-client - authenticated REST client for the retail storefront.
//!
//! All calls flow through a [`Client`], which attaches the stored access
//! token, and on a 401 refreshes it once and replays the request. Tokens live
//! in a [`TokenStore`] that several clients can share.
//!
//! # Example
//!
//! ```no_run
//! use storefront_client::{ApiUrl, Client, ClientConfig, Credentials};
//!
//! # async fn example() -> Result<(), storefront_client::Error> {
//! let api = ApiUrl::new("https://retail-platform-backend.onrender.com")?;
//! let client = Client::builder(ClientConfig::new(api))
//!     .navigator(|| eprintln!("session expired, please log in again"))
//!     .build()?;
//!
//! client.login(&Credentials::new("alice@example.com", "hunter22")).await?;
//! let me = client.current_user().await?;
//! println!("{}", me["email"]);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod navigation;
pub mod store;
pub mod transport;
pub mod types;

// Re-export primary types at crate root for convenience
pub use auth::{AccessToken, Credentials, RefreshToken, Registration, TokenPair};
pub use client::endpoints::{Endpoints, TokenEndpoint, TokenShape};
pub use client::{ApiResponse, Client, ClientBuilder, ClientConfig, RequestOptions};
pub use error::Error;
pub use navigation::{Navigator, NoopNavigator};
pub use store::{MemoryStorage, Storage, TokenStore};
pub use transport::{HttpRequest, HttpResponse, Method, Transport};
pub use types::ApiUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

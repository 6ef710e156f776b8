//! Token persistence.
//!
//! [`TokenStore`] owns the credential pair and keeps it in a [`Storage`]
//! medium. Authentication status is a predicate over the store's contents,
//! re-evaluated on every request.

mod memory;

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::auth::{AccessToken, RefreshToken, TokenPair};

pub use memory::MemoryStorage;

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// A synchronous key-value persistence medium.
///
/// Reads of absent keys return `None`. Implementations never fail from the
/// caller's point of view; a medium that can fail internally (a file, say)
/// logs the failure and carries on.
pub trait Storage: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str);

    /// Remove a value. Removing an absent key is a no-op.
    fn remove(&self, key: &str);
}

/// Holder of the current access/refresh token pair.
///
/// Cloning is cheap and every clone shares the same medium, so a single store
/// can back several clients. The store also owns the gate that serializes
/// token refreshes across those clients.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    storage: Box<dyn Storage>,
    // Guards the two keys as a unit so readers never see a half-written pair.
    pair: RwLock<()>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl TokenStore {
    /// Create a store over the given medium.
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                storage: Box::new(storage),
                pair: RwLock::new(()),
                refresh_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Create a store backed by process memory.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// Returns the current access token, if any.
    pub fn access_token(&self) -> Option<AccessToken> {
        let _read = self.inner.pair.read().unwrap_or_else(PoisonError::into_inner);
        self.inner
            .storage
            .get(ACCESS_TOKEN_KEY)
            .map(AccessToken::new)
    }

    /// Returns the current refresh token, if any.
    pub fn refresh_token(&self) -> Option<RefreshToken> {
        let _read = self.inner.pair.read().unwrap_or_else(PoisonError::into_inner);
        self.inner
            .storage
            .get(REFRESH_TOKEN_KEY)
            .map(RefreshToken::new)
    }

    /// Returns both tokens read under one lock, if both are present.
    pub fn tokens(&self) -> Option<TokenPair> {
        let _read = self.inner.pair.read().unwrap_or_else(PoisonError::into_inner);
        let access = self.inner.storage.get(ACCESS_TOKEN_KEY)?;
        let refresh = self.inner.storage.get(REFRESH_TOKEN_KEY)?;
        Some(TokenPair::new(access, refresh))
    }

    /// Replace both tokens.
    pub fn set_tokens(&self, access: &AccessToken, refresh: &RefreshToken) {
        let _write = self
            .inner
            .pair
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.storage.set(ACCESS_TOKEN_KEY, access.as_str());
        self.inner.storage.set(REFRESH_TOKEN_KEY, refresh.as_str());
        debug!("Stored new token pair");
    }

    /// Replace both tokens from a [`TokenPair`].
    pub fn set_pair(&self, pair: &TokenPair) {
        self.set_tokens(&pair.access, &pair.refresh);
    }

    /// Remove both tokens. Clearing an empty store is a no-op.
    pub fn clear(&self) {
        let _write = self
            .inner
            .pair
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.storage.remove(ACCESS_TOKEN_KEY);
        self.inner.storage.remove(REFRESH_TOKEN_KEY);
        debug!("Cleared stored tokens");
    }

    /// Returns true if an access token is present.
    ///
    /// The token is not validated; an expired token still counts until the
    /// server rejects it.
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    pub(crate) fn refresh_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.inner.refresh_gate
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("authenticated", &self.is_authenticated())
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}

//! Client construction with on-disk token persistence.

pub mod storage;

use std::time::Duration;

use anyhow::{Context, Result};
use storefront_client::{ApiUrl, Client, ClientConfig, TokenStore};

use crate::cli::GlobalArgs;
use crate::output;

use storage::FileStorage;

/// Build a client whose tokens persist in the configured token file.
///
/// Session expiry is reported on stderr with a hint to log in again.
pub fn connect(global: &GlobalArgs) -> Result<Client> {
    let base_url = ApiUrl::new(&global.base_url).context("Invalid base URL")?;

    let path = match &global.token_file {
        Some(path) => path.clone(),
        None => storage::default_token_path()?,
    };
    let tokens = TokenStore::new(FileStorage::open(&path)?);

    let config = ClientConfig::new(base_url).with_timeout(Duration::from_secs(global.timeout));

    let client = Client::builder(config)
        .token_store(tokens)
        .navigator(|| {
            output::error("Session expired. Run 'storefront auth login' to sign in again.");
        })
        .build()
        .context("Failed to build HTTP client")?;

    Ok(client)
}

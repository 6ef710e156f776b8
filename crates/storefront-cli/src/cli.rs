//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands::api::ApiCommand;
use crate::commands::auth::AuthCommand;
use crate::commands::health::HealthArgs;

/// Storefront CLI for authenticated access to the shop backend.
#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(author, version = env!("STOREFRONT_VERSION"), about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Backend base URL
    #[arg(
        long,
        global = true,
        env = "STOREFRONT_API_URL",
        default_value = storefront_client::client::endpoints::DEFAULT_BASE_URL
    )]
    pub base_url: String,

    /// File holding the saved tokens (defaults to the user data directory)
    #[arg(long, global = true, env = "STOREFRONT_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Login, registration and session management
    Auth(AuthCommand),

    /// Raw authenticated requests against any endpoint
    Api(ApiCommand),

    /// Check backend health
    Health(HealthArgs),
}

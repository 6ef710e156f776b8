//! Raw API request commands.
//!
//! These reach every backend endpoint (catalog, cart, orders) through the
//! same authenticated pipeline as the typed auth commands.

use anyhow::{Context, Result, anyhow};
use clap::{Args, Subcommand};

use storefront_client::{Method, RequestOptions};

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct ApiCommand {
    #[command(subcommand)]
    pub command: ApiSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ApiSubcommand {
    /// Send a GET request
    Get(RequestArgs),

    /// Send a POST request
    Post(RequestArgs),

    /// Send a PUT request
    Put(RequestArgs),

    /// Send a DELETE request
    Delete(RequestArgs),
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Request path, e.g. /api/orders
    pub path: String,

    /// JSON request body
    #[arg(long)]
    pub data: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "query", short = 'q', value_parser = parse_key_value)]
    pub query: Vec<(String, String)>,

    /// Extra header as name:value (repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Send without the saved access token
    #[arg(long)]
    pub no_auth: bool,
}

pub async fn handle(cmd: ApiCommand, global: &GlobalArgs) -> Result<()> {
    match cmd.command {
        ApiSubcommand::Get(args) => run(Method::GET, args, global).await,
        ApiSubcommand::Post(args) => run(Method::POST, args, global).await,
        ApiSubcommand::Put(args) => run(Method::PUT, args, global).await,
        ApiSubcommand::Delete(args) => run(Method::DELETE, args, global).await,
    }
}

async fn run(method: Method, args: RequestArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect(global)?;

    let body = match &args.data {
        Some(data) => Some(
            serde_json::from_str::<serde_json::Value>(data).context("Invalid --data JSON")?,
        ),
        None if method == Method::POST || method == Method::PUT => Some(serde_json::json!({})),
        None => None,
    };

    let mut options = RequestOptions::new();
    for (key, value) in args.query {
        options = options.query(key, value);
    }
    for (name, value) in args.headers {
        options = options.header(name, value);
    }
    if args.no_auth {
        options = options.without_auth();
    }

    let response = client
        .execute(method.clone(), &args.path, body.as_ref(), &options)
        .await
        .with_context(|| format!("{} {} failed", method, args.path))?;

    match response.body() {
        Some(body) => output::json_pretty(body)?,
        None => output::success(&format!("{} (no content)", response.status())),
    }

    Ok(())
}

fn parse_key_value(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{}'", s))?;
    Ok((key.to_string(), value.to_string()))
}

fn parse_header(s: &str) -> Result<(String, String)> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| anyhow!("expected name:value, got '{}'", s))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

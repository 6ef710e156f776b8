//! Refresh command implementation.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect(global)?;

    if client.tokens().refresh_token().is_none() {
        bail!("No active session. Run 'storefront auth login' first.");
    }

    eprintln!("{}", "Refreshing session...".dimmed());

    if !client.refresh().await {
        bail!("Failed to refresh session");
    }

    output::success("Session refreshed successfully");
    Ok(())
}

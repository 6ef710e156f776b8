//! Health command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct HealthArgs {}

pub async fn run(_args: HealthArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect(global)?;

    let body = client.health().await.context("Health check failed")?;

    output::success("Backend is up");
    if let Some(body) = body {
        output::json_pretty(&body)?;
    }
    Ok(())
}

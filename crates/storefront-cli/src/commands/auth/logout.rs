//! Logout command implementation.

use anyhow::Result;
use clap::Args;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect(global)?;

    if !client.is_authenticated() {
        output::success("Not logged in");
        return Ok(());
    }

    // Saved tokens are dropped even when the backend call fails.
    if let Err(e) = client.logout().await {
        output::warning(&format!("Backend logout failed: {}", e));
    }

    output::success("Logged out");
    Ok(())
}

//! Status command implementation.

use anyhow::Result;
use clap::Args;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct StatusArgs {}

pub fn run(_args: StatusArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect(global)?;

    if client.is_authenticated() {
        output::success("Authenticated");
    } else {
        output::field("Status", "anonymous");
    }
    output::field("API", &client.base_url().to_string());

    Ok(())
}

//! Whoami command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the full user record as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: WhoamiArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect(global)?;

    if !client.is_authenticated() {
        bail!("No active session. Run 'storefront auth login' first.");
    }

    let user = client
        .current_user()
        .await
        .context("Failed to fetch current user")?;

    if args.json {
        return output::json_pretty(&user);
    }

    output::json_field("ID", &user, "id");
    output::json_field("Email", &user, "email");
    output::json_field("Role", &user, "role");
    if let Some(profile) = user.get("profile") {
        output::json_field("First name", profile, "first_name");
        output::json_field("Last name", profile, "last_name");
    }
    output::field("API", &client.base_url().to_string());

    Ok(())
}

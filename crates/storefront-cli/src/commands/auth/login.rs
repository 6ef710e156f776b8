//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use storefront_client::Credentials;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email address
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(args: LoginArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect(global)?;
    let credentials = Credentials::new(&args.email, &args.password);

    eprintln!("{}", "Logging in...".dimmed());

    client.login(&credentials).await.context("Failed to login")?;

    output::success("Logged in successfully");
    println!();

    // The login response only carries tokens; the profile comes from /me.
    match client.current_user().await {
        Ok(user) => {
            output::json_field("ID", &user, "id");
            output::json_field("Email", &user, "email");
            output::json_field("Role", &user, "role");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch user after login");
            output::field("Email", credentials.email());
        }
    }

    Ok(())
}

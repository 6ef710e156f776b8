//! Register command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use storefront_client::Registration;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Account email address
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// First name
    #[arg(long)]
    pub first_name: Option<String>,

    /// Last name
    #[arg(long)]
    pub last_name: Option<String>,
}

pub async fn run(args: RegisterArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect(global)?;

    let mut registration = Registration::new(args.email, args.password);
    if let Some(first_name) = args.first_name {
        registration = registration.with_first_name(first_name);
    }
    if let Some(last_name) = args.last_name {
        registration = registration.with_last_name(last_name);
    }

    eprintln!("{}", "Creating account...".dimmed());

    let user = client
        .register(&registration)
        .await
        .context("Failed to register")?;

    output::success("Account created");
    println!();
    output::json_field("ID", &user, "id");
    output::json_field("Email", &user, "email");
    output::json_field("Role", &user, "role");

    if !client.is_authenticated() {
        output::warning("No session was issued. Run 'storefront auth login' to sign in.");
    }

    Ok(())
}

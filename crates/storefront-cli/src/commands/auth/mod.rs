//! Auth subcommand implementations.

mod login;
mod logout;
mod refresh;
mod register;
mod status;
mod whoami;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::GlobalArgs;

#[derive(Args, Debug)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Log in and save the session tokens
    Login(login::LoginArgs),

    /// Create a new account
    Register(register::RegisterArgs),

    /// End the session and forget the saved tokens
    Logout(logout::LogoutArgs),

    /// Display the authenticated user
    Whoami(whoami::WhoamiArgs),

    /// Show whether tokens are saved (no network access)
    Status(status::StatusArgs),

    /// Exchange the refresh token for a new access token
    Refresh(refresh::RefreshArgs),
}

pub async fn handle(cmd: AuthCommand, global: &GlobalArgs) -> Result<()> {
    match cmd.command {
        AuthSubcommand::Login(args) => login::run(args, global).await,
        AuthSubcommand::Register(args) => register::run(args, global).await,
        AuthSubcommand::Logout(args) => logout::run(args, global).await,
        AuthSubcommand::Whoami(args) => whoami::run(args, global).await,
        AuthSubcommand::Status(args) => status::run(args, global),
        AuthSubcommand::Refresh(args) => refresh::run(args, global).await,
    }
}

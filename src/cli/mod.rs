//! CLI entry point for authkeep.

pub mod handlers;

use clap::{Parser, Subcommand};

/// Session authentication against a token-issuing API
#[derive(Parser, Debug)]
#[command(name = "authkeep", version, about = "authkeep: session authentication CLI")]
pub struct Cli {
    /// Session profile to use
    #[arg(short, long, global = true, default_value = "default")]
    pub profile: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in with a JSON credentials object
    Login(BodyArgs),
    /// Create an account with a JSON user object
    Signup(BodyArgs),
    /// End the session
    Logout,
    /// Exchange the refresh token for a new access token
    Refresh,
    /// Show session status
    Status,
    /// Fetch the current user's profile
    Me,
    /// Detach a provider from the account
    Unlink(UnlinkArgs),
}

/// JSON request body, e.g. `'{"email":"a@b.c","password":"pw"}'`.
#[derive(Parser, Debug)]
pub struct BodyArgs {
    #[arg(short, long)]
    pub body: String,
}

/// Arguments for `authkeep unlink`.
#[derive(Parser, Debug)]
pub struct UnlinkArgs {
    /// Provider name (facebook, google, github, linkedin, twitter, ...)
    pub provider: String,
}

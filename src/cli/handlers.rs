//! CLI command handlers.

use std::sync::Arc;

use crate::auth::{AuthCoordinator, FileStorage, FileStorageConfig, TokenStore};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::http::ReqwestClient;
use crate::navigation::Redirect;

use super::{Cli, Commands};

/// Build a coordinator over the on-disk session for `profile`.
pub fn coordinator(config: AuthConfig, profile: &str) -> Result<AuthCoordinator, AuthError> {
    let storage = FileStorage::new(
        FileStorageConfig::new(FileStorageConfig::default_dir()).with_profile(profile),
    );
    let store = Arc::new(TokenStore::new(Arc::new(storage)));
    let client = ReqwestClient::from_config(&config)?.with_token_store(store.clone());
    Ok(AuthCoordinator::new(Arc::new(config), Arc::new(client), store))
}

/// Run one parsed command, printing results to stdout.
pub async fn run(cli: Cli) -> Result<(), AuthError> {
    let config = AuthConfig::from_env()?;
    let auth = coordinator(config, &cli.profile)?;

    match cli.command {
        Commands::Login(args) => {
            let result = auth.login(serde_json::from_str(&args.body)?, Redirect::Skip).await?;
            println!("Logged in (refresh token: {})", yes_no(result.token.has_refresh_token()));
        }
        Commands::Signup(args) => {
            auth.signup(serde_json::from_str(&args.body)?, Redirect::Skip).await?;
            if auth.is_authenticated() {
                println!("Signed up and logged in");
            } else {
                println!("Signed up");
            }
        }
        Commands::Logout => {
            auth.logout(Redirect::Skip).await;
            println!("Logged out");
        }
        Commands::Refresh => {
            auth.update_token().await?;
            println!("Access token refreshed");
        }
        Commands::Status => {
            let status = auth.status();
            println!("authenticated: {}", yes_no(status.authenticated));
            match status.expired {
                Some(expired) => println!("expired:       {}", yes_no(expired)),
                None => println!("expired:       unknown"),
            }
            println!("refresh token: {}", yes_no(auth.get_refresh_token().is_some()));
            if let Some(payload) = status.payload {
                println!("payload:       {}", serde_json::to_string_pretty(&payload)?);
            }
        }
        Commands::Me => {
            let me = auth.get_me(None).await?;
            println!("{}", serde_json::to_string_pretty(&me)?);
        }
        Commands::Unlink(args) => {
            auth.unlink(&args.provider).await?;
            println!("Unlinked {}", args.provider);
        }
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

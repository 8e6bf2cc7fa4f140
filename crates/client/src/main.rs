//! `capstock`: command-line front end for the CapStock session core.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;

use capstock_client::{AppState, ClientConfig, LoginRequest};
use capstock_observability::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "capstock", about = "CapStock dashboard session client")]
struct Cli {
    /// Human-readable logs instead of JSON.
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and persist the session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CAPSTOCK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out; the local session is cleared even if the backend is unreachable.
    Logout,
    /// Show the current session state.
    Status,
    /// Show the signed-in user's profile.
    Whoami,
    /// Evaluate navigation to a dashboard path.
    Navigate {
        path: String,
        /// Follow redirects to the page that finally opens.
        #[arg(long)]
        follow: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.pretty { LogFormat::Pretty } else { LogFormat::Json };
    capstock_observability::init_with(format, "warn");

    let config = ClientConfig::from_env().context("invalid client configuration")?;
    let state = AppState::new(&config);

    let output = match cli.command {
        Command::Login { email, password } => {
            state
                .auth
                .login(&LoginRequest { email, password })
                .await
                .context("login failed")?;
            json!({ "authenticated": state.session.is_authenticated(), "roles": state.session.roles() })
        }
        Command::Logout => {
            let result = state.auth.logout().await;
            if let Err(err) = &result {
                tracing::warn!(error = %err, "backend logout failed");
            }
            json!({ "authenticated": state.session.is_authenticated(), "backend_ok": result.is_ok() })
        }
        Command::Status => {
            let authenticated = state.session.is_authenticated();
            let claims = state.session.claims();
            json!({
                "authenticated": authenticated,
                "state": state.session.state(),
                "user": claims.as_ref().and_then(|c| c.display_name()),
                "expires_at": claims.as_ref().and_then(|c| c.expires_at()),
                "is_super_admin": state.session.is_super_admin(),
                "is_admin": state.session.is_admin(),
                "is_user": state.session.is_user(),
            })
        }
        Command::Whoami => {
            let user = state.users.current_user().await.context("failed to fetch current user")?;
            serde_json::to_value(user)?
        }
        Command::Navigate { path, follow } => {
            let navigation = if follow {
                state.navigator.settle(&path)
            } else {
                state.navigator.navigate(&path)
            };
            serde_json::to_value(navigation)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

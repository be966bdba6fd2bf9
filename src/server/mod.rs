//! Server orchestration: command-line dispatch, administrative commands and
//! the HTTP daemon.
//!
//! Binary crates remain thin wrappers that only need to call [`run`].

pub mod admin;
pub mod cli;
pub mod daemon;

use anyhow::Result;
pub use cli::{AppConfig, Cli, Commands, CreateUserArgs, GrantRoleArgs, load_cli};
pub use daemon::run_daemon;

/// Parse CLI arguments and execute the requested command or daemon.
///
/// # Errors
///
/// Returns any error emitted while parsing configuration, running a command
/// or serving requests.
pub async fn run() -> Result<()> {
    let cli = load_cli(std::env::args_os())?;
    run_with_cli(cli).await
}

/// Execute the server logic using an already parsed [`Cli`].
///
/// # Errors
///
/// Propagates any failure reported by the command or the daemon.
pub async fn run_with_cli(cli: Cli) -> Result<()> {
    let Cli { config, command } = cli;
    if let Some(command) = command {
        admin::run_command(command, &config).await
    } else {
        run_daemon(config).await
    }
}

//! Shared CLI type definitions for the ecg-community build and runtime.
//!
//! The `build.rs` script renders a man page from these types and the server
//! binary parses its command line with them, so both always agree on the
//! flags and subcommands that exist.

// Clap and OrthoConfig derive macros inject generated code throughout the
// module; there is no way to narrow these suppressions further.
#![expect(
    non_snake_case,
    reason = "Clap/OrthoConfig derive macros generate helper modules with uppercase names"
)]
#![allow(
    missing_docs,
    reason = "OrthoConfig and Clap derive macros generate items that cannot be documented"
)]
#![allow(
    unfulfilled_lint_expectations,
    reason = "derive macros conditionally generate items"
)]

use clap::{Args, Parser, Subcommand};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

// These duplicate `argon2::Params::DEFAULT_*` so build-time consumers do not
// need `argon2` as a build-dependency.

/// Default Argon2 memory cost (matches `argon2::Params::DEFAULT_M_COST`).
pub const DEFAULT_ARGON2_M_COST: u32 = 19_456;
/// Default Argon2 time cost (matches `argon2::Params::DEFAULT_T_COST`).
pub const DEFAULT_ARGON2_T_COST: u32 = 2;
/// Default Argon2 parallelism cost (matches `argon2::Params::DEFAULT_P_COST`).
pub const DEFAULT_ARGON2_P_COST: u32 = 1;

/// Default lifetime of issued bearer tokens.
pub const DEFAULT_TOKEN_TTL_DAYS: u32 = 30;

/// Arguments for the `create-user` administrative subcommand.
#[derive(Parser, OrthoConfig, Deserialize, Serialize, Default, Debug, Clone)]
#[ortho_config(prefix = "ECG_")]
pub struct CreateUserArgs {
    /// Email address used to log in.
    #[arg(long)]
    pub email: Option<String>,
    /// Display name for the new account.
    #[arg(long)]
    pub username: Option<String>,
    /// Password for the new account.
    #[arg(long)]
    pub password: Option<String>,
    /// Role to grant; defaults to Visitor.
    #[arg(long)]
    pub role: Option<String>,
}

/// Arguments for the `grant-role` administrative subcommand.
#[derive(Parser, OrthoConfig, Deserialize, Serialize, Default, Debug, Clone)]
#[ortho_config(prefix = "ECG_")]
pub struct GrantRoleArgs {
    /// Email address of the existing account.
    #[arg(long)]
    pub email: Option<String>,
    /// Name of the role to grant.
    #[arg(long)]
    pub role: Option<String>,
}

/// CLI subcommands exposed by `ecg-community`.
#[derive(Subcommand, Deserialize, Serialize, Debug, Clone)]
pub enum Commands {
    /// Create a new account.
    #[command(name = "create-user")]
    CreateUser(CreateUserArgs),
    /// Add a role to an existing account.
    #[command(name = "grant-role")]
    GrantRole(GrantRoleArgs),
}

impl Commands {
    /// Name of the subcommand as typed on the command line.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateUser(_) => "create-user",
            Self::GrantRole(_) => "grant-role",
        }
    }
}

/// Runtime configuration.
///
/// The default bind address `0.0.0.0:3000` listens on all interfaces.
/// Production deployments should bind to a specific interface and sit
/// behind a reverse proxy that terminates TLS.
#[derive(Args, OrthoConfig, Serialize, Deserialize, Default, Debug, Clone)]
#[ortho_config(prefix = "ECG_")]
pub struct AppConfig {
    /// Server bind address.
    #[ortho_config(default = "0.0.0.0:3000".to_owned())]
    #[arg(long, default_value_t = String::from("0.0.0.0:3000"))]
    pub bind: String,
    /// Database connection string or path.
    #[ortho_config(default = "ecg.db".to_owned())]
    #[arg(long, default_value_t = String::from("ecg.db"))]
    pub database: String,
    /// Secret used to sign bearer tokens. A random secret is generated when
    /// unset, which invalidates every token on restart.
    #[arg(long)]
    pub token_secret: Option<String>,
    /// Lifetime of issued bearer tokens in days.
    #[ortho_config(default = DEFAULT_TOKEN_TTL_DAYS)]
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_DAYS)]
    pub token_ttl_days: u32,
    /// Argon2 memory cost parameter.
    #[ortho_config(default = DEFAULT_ARGON2_M_COST)]
    #[arg(long, default_value_t = DEFAULT_ARGON2_M_COST)]
    pub argon2_m_cost: u32,
    /// Argon2 time cost parameter.
    #[ortho_config(default = DEFAULT_ARGON2_T_COST)]
    #[arg(long, default_value_t = DEFAULT_ARGON2_T_COST)]
    pub argon2_t_cost: u32,
    /// Argon2 parallelism cost parameter.
    #[ortho_config(default = DEFAULT_ARGON2_P_COST)]
    #[arg(long, default_value_t = DEFAULT_ARGON2_P_COST)]
    pub argon2_p_cost: u32,
    /// Email of the administrator created on first start.
    #[arg(long)]
    pub admin_email: Option<String>,
    /// Password of the administrator created on first start.
    #[arg(long)]
    pub admin_password: Option<String>,
    /// Display name of the administrator created on first start.
    #[arg(long)]
    pub admin_username: Option<String>,
}

/// Top-level CLI entry point consumed by binaries.
#[derive(Parser, Deserialize, Serialize, Debug, Clone)]
#[command(name = "ecg-community", version, about = "Membership community backend")]
pub struct Cli {
    /// Application configuration.
    #[command(flatten)]
    pub config: AppConfig,
    /// Optional subcommand.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use argon2::Params;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn argon2_defaults_track_the_crate() {
        assert_eq!(DEFAULT_ARGON2_M_COST, Params::DEFAULT_M_COST);
        assert_eq!(DEFAULT_ARGON2_T_COST, Params::DEFAULT_T_COST);
        assert_eq!(DEFAULT_ARGON2_P_COST, Params::DEFAULT_P_COST);
    }

    #[rstest]
    #[case(&["ecg-community"], None)]
    #[case(&["ecg-community", "create-user", "--email", "a@b.c"], Some("create-user"))]
    #[case(&["ecg-community", "--bind", "127.0.0.1:1", "grant-role"], Some("grant-role"))]
    fn subcommands_parse(#[case] argv: &[&str], #[case] expected: Option<&str>) {
        let cli = Cli::try_parse_from(argv).expect("parse");
        assert_eq!(cli.command.as_ref().map(Commands::name), expected);
    }

    #[rstest]
    fn clap_defaults_match_documented_values() {
        let cli = Cli::try_parse_from(["ecg-community"]).expect("parse");
        assert_eq!(cli.config.bind, "0.0.0.0:3000");
        assert_eq!(cli.config.database, "ecg.db");
        assert_eq!(cli.config.token_ttl_days, DEFAULT_TOKEN_TTL_DAYS);
        assert!(cli.config.token_secret.is_none());
    }
}

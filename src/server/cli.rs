//! Command-line parsing and layered configuration loading.
//!
//! The flag definitions live in the `cli-defs` crate so `build.rs` can render
//! a man page from them. This module layers the `.ecg.toml` dotfile and
//! `ECG_*` environment variables underneath whatever was typed.

use std::ffi::OsString;

use anyhow::{Result, anyhow};
use clap::Parser;
pub use cli_defs::{AppConfig, Cli, Commands, CreateUserArgs, GrantRoleArgs};
use ortho_config::OrthoConfig;

/// Arguments preceding the subcommand, which are the ones that configure the
/// application itself.
fn config_args(args: &[OsString], command: Option<&Commands>) -> Vec<OsString> {
    let Some(command) = command else {
        return args.to_vec();
    };
    let end = args
        .iter()
        .skip(1)
        .position(|arg| arg.as_os_str() == command.name())
        .map_or(args.len(), |at| at + 1);
    args.iter().take(end).cloned().collect()
}

/// Parse `args` and merge the application configuration with its file and
/// environment layers.
///
/// # Errors
/// Returns clap errors for malformed command lines and any failure reported
/// while merging configuration sources.
pub fn load_cli<I, T>(args: I) -> Result<Cli>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let Cli { command, .. } = Cli::try_parse_from(&args)?;
    let config = AppConfig::load_from_iter(config_args(&args, command.as_ref()))
        .map_err(|err| anyhow!("failed to load configuration: {err}"))?;
    Ok(Cli { config, command })
}

#[cfg(test)]
mod tests {
    use figment::Jail;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn env_config_loading() {
        Jail::expect_with(|j| {
            j.set_env("ECG_BIND", "127.0.0.1:8000");
            j.set_env("ECG_DATABASE", "env.db");
            let cfg = AppConfig::load_from_iter(["ecg-community"]).expect("load");
            assert_eq!(cfg.bind, "127.0.0.1:8000");
            assert_eq!(cfg.database, "env.db");
            Ok(())
        });
    }

    #[rstest]
    fn cli_overrides_env() {
        Jail::expect_with(|j| {
            j.set_env("ECG_BIND", "127.0.0.1:8000");
            let cfg = AppConfig::load_from_iter(["ecg-community", "--bind", "0.0.0.0:9000"])
                .expect("load");
            assert_eq!(cfg.bind, "0.0.0.0:9000");
            Ok(())
        });
    }

    #[rstest]
    fn loads_from_dotfile() {
        Jail::expect_with(|j| {
            j.create_file(
                ".ecg.toml",
                "bind = \"1.2.3.4:1111\"\ntoken_ttl_days = 7\nadmin_email = \"root@example.com\"",
            )?;
            let cfg = AppConfig::load_from_iter(["ecg-community"]).expect("load");
            assert_eq!(cfg.bind, "1.2.3.4:1111");
            assert_eq!(cfg.token_ttl_days, 7);
            assert_eq!(cfg.admin_email.as_deref(), Some("root@example.com"));
            Ok(())
        });
    }

    #[rstest]
    fn argon2_cli() {
        Jail::expect_with(|_j| {
            let cfg = AppConfig::load_from_iter(["ecg-community", "--argon2-m-cost", "1024"])
                .expect("load");
            assert_eq!(cfg.argon2_m_cost, 1024);
            Ok(())
        });
    }

    #[rstest]
    fn subcommand_arguments_do_not_reach_the_config_layer() {
        Jail::expect_with(|j| {
            j.set_env("ECG_DATABASE", "env.db");
            let cli = load_cli([
                "ecg-community",
                "--bind",
                "127.0.0.1:4000",
                "grant-role",
                "--email",
                "a@example.com",
                "--role",
                "Member",
            ])
            .expect("load");
            assert_eq!(cli.config.bind, "127.0.0.1:4000");
            assert_eq!(cli.config.database, "env.db");
            assert!(matches!(cli.command, Some(Commands::GrantRole(_))));
            Ok(())
        });
    }

    #[rstest]
    #[case(&["ecg-community", "--bind", "x"], 3)]
    #[case(&["ecg-community", "--bind", "x", "create-user", "--email", "e"], 3)]
    fn config_args_stop_at_the_subcommand(#[case] argv: &[&str], #[case] expected: usize) {
        let args: Vec<OsString> = argv.iter().map(OsString::from).collect();
        let cli = Cli::try_parse_from(&args).expect("parse");
        assert_eq!(config_args(&args, cli.command.as_ref()).len(), expected);
    }
}

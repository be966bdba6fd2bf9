//! Administrative command handlers.
//!
//! These run against the configured database without starting the HTTP
//! server. Both commands migrate and seed first so they work on a fresh
//! database file.

#![allow(
    clippy::shadow_reuse,
    reason = "intentional shadowing for config merging"
)]
#![allow(
    clippy::print_stdout,
    reason = "intentional user output for CLI commands"
)]

use anyhow::{Context, Result, anyhow, bail};
use argon2::{Algorithm, Argon2, ParamsBuilder, Version};
use diesel_async::AsyncConnection;
use ortho_config::load_and_merge_subcommand_for;

use super::cli::{AppConfig, Commands, CreateUserArgs, GrantRoleArgs};
use crate::{
    credentials::hash_password,
    db::{self, DbConnection, apply_migrations, establish_connection},
    error::ServiceError,
    models::NewUser,
    seed::{BootstrapAdmin, seed},
    services::auth::normalize_email,
};

/// Role given by `create-user` when none is named.
const DEFAULT_ROLE: &str = "Visitor";

/// Execute an administrative command.
///
/// # Errors
///
/// Propagates failures from configuration merging or database operations.
pub async fn run_command(command: Commands, cfg: &AppConfig) -> Result<()> {
    match command {
        Commands::CreateUser(args) => {
            let args = load_and_merge_subcommand_for::<CreateUserArgs>(&args)?;
            run_create_user(args, cfg).await
        }
        Commands::GrantRole(args) => {
            let args = load_and_merge_subcommand_for::<GrantRoleArgs>(&args)?;
            run_grant_role(args, cfg).await
        }
    }
}

/// Build an Argon2 instance using the supplied configuration parameters.
///
/// # Errors
///
/// Returns any error emitted while constructing the Argon2 parameter set.
pub fn argon2_from_config(cfg: &AppConfig) -> Result<Argon2<'static>> {
    let params = ParamsBuilder::new()
        .m_cost(cfg.argon2_m_cost)
        .t_cost(cfg.argon2_t_cost)
        .p_cost(cfg.argon2_p_cost)
        .build()
        .with_context(|| {
            format!(
                "invalid Argon2 params derived from config: m_cost={}, t_cost={}, p_cost={}",
                cfg.argon2_m_cost, cfg.argon2_t_cost, cfg.argon2_p_cost
            )
        })?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Bootstrap administrator named by the configuration, if complete.
#[must_use]
pub fn bootstrap_admin(cfg: &AppConfig) -> Option<BootstrapAdmin> {
    BootstrapAdmin::from_parts(
        cfg.admin_email.as_deref(),
        cfg.admin_password.as_deref(),
        cfg.admin_username.as_deref(),
    )
}

async fn open_seeded(cfg: &AppConfig, argon2: &Argon2<'_>) -> Result<DbConnection> {
    let mut conn = establish_connection(&cfg.database)
        .await
        .with_context(|| format!("failed to open database '{}'", cfg.database))?;
    apply_migrations(&mut conn, &cfg.database).await?;
    seed(&mut conn, argon2, bootstrap_admin(cfg).as_ref())
        .await
        .context("failed to seed database")?;
    Ok(conn)
}

async fn run_create_user(args: CreateUserArgs, cfg: &AppConfig) -> Result<()> {
    let email = normalize_email(&args.email.ok_or_else(|| anyhow!("missing email"))?);
    let username = args.username.ok_or_else(|| anyhow!("missing username"))?;
    let password = args.password.ok_or_else(|| anyhow!("missing password"))?;
    let role_name = args.role.unwrap_or_else(|| DEFAULT_ROLE.to_owned());

    let argon2 = argon2_from_config(cfg)?;
    let mut conn = open_seeded(cfg, &argon2).await?;
    let role = db::roles::find_role_by_name(&mut conn, &role_name)
        .await?
        .ok_or_else(|| anyhow!("unknown role '{role_name}'"))?;
    if db::users::find_user_by_email(&mut conn, &email).await?.is_some() {
        bail!("an account for '{email}' already exists");
    }
    let hashed = hash_password(&argon2, &password)?;
    let role_name = role.name.clone();
    let user = conn
        .transaction::<_, ServiceError, _>(|conn| {
            Box::pin(async move {
                let at = db::now();
                let user = db::users::create_user(
                    conn,
                    &NewUser {
                        email: &email,
                        password: &hashed,
                        username: &username,
                        registered_at: at,
                        last_login_at: at,
                    },
                )
                .await?;
                db::users::grant_role(conn, user.id, role.id).await?;
                Ok(user)
            })
        })
        .await
        .context("failed to create user")?;
    println!("User {} created with role {role_name}", user.email);
    Ok(())
}

async fn run_grant_role(args: GrantRoleArgs, cfg: &AppConfig) -> Result<()> {
    let email = normalize_email(&args.email.ok_or_else(|| anyhow!("missing email"))?);
    let role_name = args.role.ok_or_else(|| anyhow!("missing role"))?;

    let argon2 = argon2_from_config(cfg)?;
    let mut conn = open_seeded(cfg, &argon2).await?;
    let user = db::users::find_user_by_email(&mut conn, &email)
        .await?
        .ok_or_else(|| anyhow!("no account for '{email}'"))?;
    let role = db::roles::find_role_by_name(&mut conn, &role_name)
        .await?
        .ok_or_else(|| anyhow!("unknown role '{role_name}'"))?;
    db::users::grant_role(&mut conn, user.id, role.id).await?;
    println!("Role {} granted to {}", role.name, user.email);
    Ok(())
}

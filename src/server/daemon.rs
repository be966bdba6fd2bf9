//! HTTP daemon start-up and shutdown.

use anyhow::{Context, Result, anyhow};
use chrono::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
use url::Url;

use super::{
    admin::{argon2_from_config, bootstrap_admin},
    cli::AppConfig,
};
use crate::{
    db::{DbPool, apply_migrations, establish_pool},
    http::{AppState, router},
    seed::seed,
    token::TokenSigner,
};

/// Build the token signer from configuration.
///
/// A blank or missing secret yields a random key, so tokens do not survive
/// a restart.
///
/// # Errors
/// Returns an error if the MAC rejects the key.
pub fn token_signer(cfg: &AppConfig) -> Result<TokenSigner> {
    let ttl = Duration::days(i64::from(cfg.token_ttl_days));
    match cfg.token_secret.as_deref().map(str::trim) {
        Some(secret) if !secret.is_empty() => TokenSigner::new(secret.as_bytes(), ttl),
        _ => {
            warn!("no token secret configured; issued tokens will not survive a restart");
            TokenSigner::random(ttl)
        }
    }
    .map_err(|err| anyhow!("invalid token secret: {err}"))
}

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
fn is_postgres_url(s: &str) -> bool {
    Url::parse(s)
        .map(|u| matches!(u.scheme(), "postgres" | "postgresql"))
        .unwrap_or(false)
}

/// Build the pool, audit the backend and apply pending migrations.
///
/// # Errors
/// Returns any failure raised while connecting, auditing or migrating.
pub async fn setup_database(database: &str) -> Result<DbPool> {
    let pool = establish_pool(database)
        .await
        .with_context(|| format!("failed to build pool for '{database}'"))?;
    {
        let mut conn = pool.get().await.context("failed to get db connection")?;
        #[cfg(feature = "sqlite")]
        crate::db::audit_sqlite_features(&mut conn).await?;
        #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
        if is_postgres_url(database) {
            crate::db::audit_postgres_features(&mut conn).await?;
        }
        apply_migrations(&mut conn, database).await?;
    }
    Ok(pool)
}

/// Prepare the database and serve HTTP until a shutdown signal arrives.
///
/// # Errors
/// Returns any failure raised while preparing state, binding the socket or
/// serving requests.
pub async fn run_daemon(cfg: AppConfig) -> Result<()> {
    let argon2 = argon2_from_config(&cfg)?;
    let signer = token_signer(&cfg)?;
    let pool = setup_database(&cfg.database).await?;
    {
        let mut conn = pool.get().await.context("failed to get db connection")?;
        seed(&mut conn, &argon2, bootstrap_admin(&cfg).as_ref())
            .await
            .context("failed to seed database")?;
    }

    let listener = TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("failed to bind '{}'", cfg.bind))?;
    info!(bind = %cfg.bind, database = %cfg.database, "ecg-community listening");

    let app = router(AppState::new(pool, argon2, signer));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(err) = res {
                            warn!(%err, "failed to listen for Ctrl-C");
                        }
                    },
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(%err, "failed to install SIGTERM handler");
                wait_for_ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        wait_for_ctrl_c().await;
    }
    info!("shutdown signal received");
}

async fn wait_for_ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to listen for Ctrl-C");
    }
}

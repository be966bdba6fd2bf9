//! Embedded migration runner.

use std::{error::Error as StdError, time::Duration};

use diesel_migrations::MigrationHarness;
use thiserror::Error;
use tokio::time::timeout;
use tracing::info;

use super::connection::{DbConnection, MIGRATIONS};

type HarnessError = Box<dyn StdError + Send + Sync>;

/// Failure while bringing the schema up to date.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration harness error: {0}")]
    Harness(HarnessError),
    #[error("migration execution exceeded {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Query(#[from] diesel::result::Error),
    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    #[error("migration connection error: {0}")]
    Connection(#[from] diesel::result::ConnectionError),
    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    #[error("migration executor error: {0}")]
    Executor(#[from] tokio::task::JoinError),
}

const MIGRATION_TIMEOUT: Duration = Duration::from_secs(10);

fn run_pending<H>(harness: &mut H) -> Result<usize, HarnessError>
where
    H: MigrationHarness<super::Backend>,
{
    if let Ok(false) = harness.has_pending_migration(MIGRATIONS) {
        info!("no pending migrations; skipping apply");
        return Ok(0);
    }
    let applied = harness.run_pending_migrations(MIGRATIONS)?;
    info!(applied = applied.len(), "applied pending migrations");
    Ok(applied.len())
}

/// Run embedded database migrations, returning how many were applied.
///
/// # Errors
/// Returns [`MigrationError`] if a migration fails or the run times out.
#[cfg(feature = "sqlite")]
#[must_use = "handle the result"]
pub async fn apply_migrations(
    conn: &mut DbConnection,
    _database_url: &str,
) -> Result<usize, MigrationError> {
    let outcome = timeout(
        MIGRATION_TIMEOUT,
        conn.spawn_blocking(|c| Ok(run_pending(c))),
    )
    .await
    .map_err(|_| MigrationError::Timeout(MIGRATION_TIMEOUT))??;
    outcome.map_err(MigrationError::Harness)
}

/// Run embedded database migrations, returning how many were applied.
///
/// Postgres migrations run on a dedicated blocking connection.
///
/// # Errors
/// Returns [`MigrationError`] if a migration fails or the run times out.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
#[must_use = "handle the result"]
pub async fn apply_migrations(
    conn: &mut DbConnection,
    database_url: &str,
) -> Result<usize, MigrationError> {
    use diesel::{Connection, pg::PgConnection};

    let _ = conn;
    let url = database_url.to_owned();
    let outcome = timeout(
        MIGRATION_TIMEOUT,
        tokio::task::spawn_blocking(move || -> Result<_, MigrationError> {
            let mut pg = PgConnection::establish(&url)?;
            Ok(run_pending(&mut pg))
        }),
    )
    .await
    .map_err(|_| MigrationError::Timeout(MIGRATION_TIMEOUT))???;
    outcome.map_err(MigrationError::Harness)
}

//! Connection and pool helpers for database access.

use cfg_if::cfg_if;
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, PoolError, bb8::Pool};
#[cfg(feature = "sqlite")]
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

cfg_if! {
    if #[cfg(all(feature = "sqlite", feature = "postgres", not(feature = "lint")))] {
        compile_error!("Either feature 'sqlite' or 'postgres' must be enabled, not both");
    } else if #[cfg(feature = "sqlite")] {
        use diesel::sqlite::{Sqlite, SqliteConnection};
        /// Database backend type for `SQLite`.
        pub type Backend = Sqlite;
        /// Embedded database migrations for `SQLite`.
        pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");
        /// Connection type for `SQLite` database access.
        pub type DbConnection = SyncConnectionWrapper<SqliteConnection>;
        /// Connection pool type for `SQLite`.
        pub type DbPool = Pool<DbConnection>;
    } else if #[cfg(all(feature = "postgres", not(feature = "sqlite")))] {
        use diesel::pg::Pg;
        use diesel_async::AsyncPgConnection;
        /// Database backend type for PostgreSQL.
        pub type Backend = Pg;
        /// Embedded database migrations for PostgreSQL.
        pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgres");
        /// Connection type for PostgreSQL database access.
        pub type DbConnection = AsyncPgConnection;
        /// Connection pool type for PostgreSQL.
        pub type DbPool = Pool<DbConnection>;
    } else {
        compile_error!("Either feature 'sqlite' or 'postgres' must be enabled");
    }
}

/// Pragmas applied to every `SQLite` connection on checkout.
///
/// Foreign keys are off by default in `SQLite`; cascades depend on them.
#[cfg(feature = "sqlite")]
const SQLITE_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;";

/// Open a single connection outside the pool.
///
/// `SQLite` connections receive the same pragmas as pooled ones.
///
/// # Errors
/// Returns any error raised while connecting or applying pragmas.
#[cfg(feature = "sqlite")]
pub async fn establish_connection(
    database_url: &str,
) -> diesel::ConnectionResult<DbConnection> {
    use diesel::result::ConnectionError;
    use diesel_async::{AsyncConnection, SimpleAsyncConnection};

    let mut conn = DbConnection::establish(database_url).await?;
    conn.batch_execute(SQLITE_PRAGMAS)
        .await
        .map_err(ConnectionError::CouldntSetupConfiguration)?;
    Ok(conn)
}

/// Open a single connection outside the pool.
///
/// # Errors
/// Returns any error raised while connecting.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub async fn establish_connection(
    database_url: &str,
) -> diesel::ConnectionResult<DbConnection> {
    use diesel_async::AsyncConnection;
    DbConnection::establish(database_url).await
}

/// Create a pooled connection to the configured database.
///
/// # Examples
///
/// ```no_run
/// use ecg_community::db::establish_pool;
/// async fn example() {
///     let pool = establish_pool("ecg.db")
///         .await
///         .expect("failed to build pool");
/// }
/// ```
///
/// # Errors
/// Returns any error reported by the underlying connection pool builder.
pub async fn establish_pool(database_url: &str) -> Result<DbPool, PoolError> {
    let manager = build_manager(database_url);
    Pool::builder().build(manager).await
}

#[cfg(feature = "sqlite")]
fn build_manager(database_url: &str) -> AsyncDieselConnectionManager<DbConnection> {
    use diesel_async::pooled_connection::ManagerConfig;
    use futures_util::FutureExt;

    let mut config = ManagerConfig::default();
    config.custom_setup = Box::new(|url| establish_connection(url).boxed());
    AsyncDieselConnectionManager::new_with_config(database_url, config)
}

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
fn build_manager(database_url: &str) -> AsyncDieselConnectionManager<DbConnection> {
    AsyncDieselConnectionManager::new(database_url)
}

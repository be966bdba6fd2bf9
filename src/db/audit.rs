//! Startup checks that the database offers what the queries rely on.

use diesel::{
    QueryableByName,
    result::{Error as DieselError, QueryResult},
    sql_query,
};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;

fn unsupported(msg: String) -> DieselError {
    DieselError::QueryBuilderError(Box::new(std::io::Error::other(msg)))
}

/// Parse the leading `major.minor` pair of a version string.
fn major_minor(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.split('.');
    let major = parts.next()?.trim().parse().ok()?;
    let minor = parts.next().map_or(Some(0), |m| {
        m.chars()
            .take_while(char::is_ascii_digit)
            .collect::<String>()
            .parse()
            .ok()
    })?;
    Some((major, minor))
}

/// Verify the `SQLite` library and connection settings.
///
/// Inserts rely on `RETURNING` (3.35 or newer) and cascading deletes rely
/// on `foreign_keys` being enabled for the connection.
///
/// # Errors
/// Returns an error when a probe query fails or a requirement is unmet.
#[cfg(feature = "sqlite")]
#[must_use = "handle the result"]
pub async fn audit_sqlite_features(conn: &mut DbConnection) -> QueryResult<()> {
    use diesel::sql_types::{Integer, Text};

    #[derive(QueryableByName)]
    struct Version {
        #[diesel(sql_type = Text)]
        version: String,
    }

    #[derive(QueryableByName)]
    struct ForeignKeys {
        #[diesel(sql_type = Integer)]
        foreign_keys: i32,
    }

    let row: Version = sql_query("SELECT sqlite_version() AS version")
        .get_result(conn)
        .await?;
    let version = major_minor(&row.version)
        .ok_or_else(|| unsupported(format!("unable to parse sqlite version: {}", row.version)))?;
    if version < (3, 35) {
        return Err(unsupported(format!(
            "sqlite {} is not supported (require >= 3.35)",
            row.version
        )));
    }

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys").get_result(conn).await?;
    if fk.foreign_keys != 1 {
        return Err(unsupported("sqlite foreign key enforcement is disabled".to_owned()));
    }
    Ok(())
}

/// Verify that the Postgres server is version 14 or newer.
///
/// # Errors
/// Returns an error when the version query fails or reports an older server.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
#[must_use = "handle the result"]
pub async fn audit_postgres_features(conn: &mut DbConnection) -> QueryResult<()> {
    use diesel::sql_types::Text;

    #[derive(QueryableByName)]
    struct Version {
        #[diesel(sql_type = Text)]
        server_version: String,
    }

    let row: Version = sql_query("SHOW server_version").get_result(conn).await?;
    let (major, _) = major_minor(&row.server_version).ok_or_else(|| {
        unsupported(format!(
            "unable to parse postgres version: {}",
            row.server_version
        ))
    })?;
    if major < 14 {
        return Err(unsupported(format!(
            "postgres version {major} is not supported (require >= 14)"
        )));
    }
    Ok(())
}

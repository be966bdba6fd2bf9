//! Manage database connections and domain queries.
//!
//! This module tree exposes helpers for creating pooled Diesel connections,
//! running embedded migrations, auditing backend capabilities, and executing
//! application queries grouped by resource.

mod audit;
pub mod categories;
pub mod channels;
mod connection;
pub mod events;
pub mod learning;
pub mod ledger;
mod migrations;
pub mod posts;
pub mod roles;
pub mod shop;
pub mod users;

#[cfg(test)]
mod tests;

use chrono::{NaiveDateTime, Utc};

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub use self::audit::audit_postgres_features;
#[cfg(feature = "sqlite")]
pub use self::audit::audit_sqlite_features;
pub use self::{
    connection::{Backend, DbConnection, DbPool, MIGRATIONS, establish_connection, establish_pool},
    migrations::{MigrationError, apply_migrations},
};

/// Current instant as stored in timestamp columns.
#[must_use]
pub fn now() -> NaiveDateTime { Utc::now().naive_utc() }

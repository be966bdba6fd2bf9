//! Utilities for integration tests.
//!
//! The `test-util` crate builds a fully migrated and seeded application on a
//! temporary `SQLite` database and drives its router in-process, so tests
//! exercise the same route table the binary serves without opening sockets.

mod app;
mod fixtures;

pub use app::{ADMIN_EMAIL, ADMIN_PASSWORD, Reply, TestApp};
pub use fixtures::{Session, cheap_argon2};

/// Boxed error type used by helpers that surface setup failures.
pub type AnyError = Box<dyn std::error::Error + Send + Sync>;

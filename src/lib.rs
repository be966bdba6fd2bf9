//! Core library for the ECG community backend.
//!
//! The crate exposes the HTTP router, the resource services it delegates to,
//! the Diesel persistence layer and the server orchestration used by the
//! `ecg-community` binary. Only one database backend (either `sqlite` or
//! `postgres`) should be enabled at a time.
cfg_if::cfg_if! {
    if #[cfg(all(feature = "sqlite", feature = "postgres", not(feature = "lint")))] {
        compile_error!("Choose either sqlite or postgres, not both");
    } else if #[cfg(feature = "sqlite")] {
        pub use diesel::sqlite::Sqlite as DbBackend;
    } else if #[cfg(feature = "postgres")] {
        pub use diesel::pg::Pg as DbBackend;
    } else {
        compile_error!("Either the 'sqlite' or 'postgres' feature must be enabled");
    }
}

pub mod access;
pub mod credentials;
pub mod db;
pub mod error;
pub mod http;
pub mod kinds;
pub mod models;
pub mod schema;
pub mod seed;
pub mod server;
pub mod services;
pub mod token;
pub mod views;

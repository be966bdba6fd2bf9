//! Domain error taxonomy shared by every service.
//!
//! Services fail fast with a [`ServiceError`]; the HTTP layer maps each
//! variant onto a status code (see [`crate::http::error`]).

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::pooled_connection::bb8::RunError;
use thiserror::Error;

use crate::kinds::UnknownVariant;

/// Failure raised by a resource service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("insufficient miles")]
    InsufficientBalance,
    #[error("this item is currently unavailable")]
    Unavailable,
    #[error("this item is out of stock")]
    OutOfStock,
    #[error("database error: {0}")]
    Database(#[source] DieselError),
    #[error("connection pool error: {0}")]
    Pool(#[from] RunError),
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// `NotFound` for the named resource.
    pub fn not_found(what: &str) -> Self { Self::NotFound(format!("{what} not found")) }

    /// `Validation` naming a missing or empty field.
    pub fn missing(field: &str) -> Self { Self::Validation(format!("{field} is required")) }

    /// `Forbidden` with the supplied explanation.
    pub fn forbidden(msg: impl Into<String>) -> Self { Self::Forbidden(msg.into()) }

    /// `Internal` for a stored value that no longer parses.
    pub fn corrupt(err: &UnknownVariant) -> Self {
        Self::Internal(format!("stored value rejected: {err}"))
    }
}

impl From<DieselError> for ServiceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound("record not found".to_owned()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                Self::Conflict("a record with the same identity already exists".to_owned())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                Self::Conflict("the record is still referenced by other records".to_owned())
            }
            other => Self::Database(other),
        }
    }
}

impl From<UnknownVariant> for ServiceError {
    fn from(err: UnknownVariant) -> Self { Self::Validation(err.to_string()) }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self { Self::Internal(format!("json encoding: {err}")) }
}

/// Convenience alias for service results.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use diesel::result::DatabaseErrorInformation;
    use rstest::rstest;

    use super::*;

    struct Info;

    impl DatabaseErrorInformation for Info {
        fn message(&self) -> &str { "constraint failed" }
        fn details(&self) -> Option<&str> { None }
        fn hint(&self) -> Option<&str> { None }
        fn table_name(&self) -> Option<&str> { None }
        fn column_name(&self) -> Option<&str> { None }
        fn constraint_name(&self) -> Option<&str> { None }
        fn statement_position(&self) -> Option<i32> { None }
    }

    #[rstest]
    #[case(DatabaseErrorKind::UniqueViolation)]
    #[case(DatabaseErrorKind::ForeignKeyViolation)]
    fn constraint_violations_become_conflicts(#[case] kind: DatabaseErrorKind) {
        let err = ServiceError::from(DieselError::DatabaseError(kind, Box::new(Info)));
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[rstest]
    fn missing_rows_become_not_found() {
        let err = ServiceError::from(DieselError::NotFound);
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[rstest]
    fn other_database_errors_are_wrapped() {
        let err = ServiceError::from(DieselError::RollbackTransaction);
        assert!(matches!(err, ServiceError::Database(_)));
    }

    #[rstest]
    fn helpers_name_the_subject() {
        assert_eq!(ServiceError::not_found("post").to_string(), "post not found");
        assert_eq!(ServiceError::missing("email").to_string(), "email is required");
    }
}

//! Small building blocks shared by the app harness and tests.

use argon2::{Algorithm, Argon2, Params, Version};
use serde_json::Value;

use crate::AnyError;

/// Argon2 with minimal costs so password hashing does not dominate tests.
///
/// # Errors
/// Returns an error if the parameter set is rejected.
pub fn cheap_argon2() -> Result<Argon2<'static>, AnyError> {
    let params = Params::new(8, 1, 1, None)?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Token and identity returned by signup or login.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: i32,
    pub user: Value,
}

impl Session {
    /// Extract a session from an auth response body.
    ///
    /// # Errors
    /// Returns an error if the body lacks a token or user id.
    pub fn from_body(body: &Value) -> Result<Self, AnyError> {
        let token = body
            .get("token")
            .and_then(Value::as_str)
            .ok_or("response has no token")?
            .to_owned();
        let user = body.get("user").cloned().ok_or("response has no user")?;
        let user_id = user
            .get("id")
            .and_then(Value::as_i64)
            .and_then(|id| i32::try_from(id).ok())
            .ok_or("response user has no id")?;
        Ok(Self {
            token,
            user_id,
            user,
        })
    }
}

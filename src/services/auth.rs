//! Account creation, login and bearer token resolution.

use argon2::Argon2;
use chrono::{DateTime, Utc};
use diesel_async::AsyncConnection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Caller, load_caller, required};
use crate::{
    credentials::{hash_password, verify_password},
    db::{self, DbConnection},
    error::{ServiceError, ServiceResult},
    kinds::RoleKind,
    models::NewUser,
    token::TokenSigner,
    views::UserView,
};

#[derive(Deserialize, Debug, Default)]
pub struct SignupInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Issued token with the account it belongs to.
#[derive(Serialize, Debug)]
pub struct Session {
    pub token: String,
    pub user: UserView,
}

/// Canonical form of an email address.
#[must_use]
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

/// Create an account holding exactly the visitor role and sign it in.
///
/// # Errors
/// Returns `Validation` for missing fields, `Conflict` when the email is
/// taken and `Internal` when the visitor role has not been seeded.
pub async fn signup(
    conn: &mut DbConnection,
    argon2: &Argon2<'_>,
    signer: &TokenSigner,
    input: SignupInput,
) -> ServiceResult<Session> {
    let email = normalize_email(&required("email", input.email)?);
    let password = input
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ServiceError::missing("password"))?;
    let username = required("username", input.username)?;

    if db::users::find_user_by_email(conn, &email).await?.is_some() {
        return Err(ServiceError::Conflict(
            "this email address is already registered".to_owned(),
        ));
    }
    let visitor = db::roles::find_role_by_kind(conn, RoleKind::Visitor.as_str())
        .await?
        .ok_or_else(|| ServiceError::Internal("visitor role has not been seeded".to_owned()))?;
    let hashed = hash_password(argon2, &password)
        .map_err(|e| ServiceError::Internal(format!("password hashing failed: {e}")))?;

    let visitor_id = visitor.id;
    let at = db::now();
    let user = conn
        .transaction::<_, ServiceError, _>(|conn| {
            Box::pin(async move {
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
                db::users::grant_role(conn, user.id, visitor_id).await?;
                Ok(user)
            })
        })
        .await?;
    info!(user_id = user.id, "account created");

    Ok(Session {
        token: signer.issue(user.id, Utc::now()),
        user: UserView::build(&user, &[visitor])?,
    })
}

/// Verify credentials, record the login and issue a token.
///
/// # Errors
/// Returns [`ServiceError::InvalidCredentials`] for an unknown email or a
/// wrong password.
pub async fn login(
    conn: &mut DbConnection,
    argon2: &Argon2<'_>,
    signer: &TokenSigner,
    input: LoginInput,
) -> ServiceResult<Session> {
    let email = normalize_email(&required("email", input.email)?);
    let password = input
        .password
        .ok_or_else(|| ServiceError::missing("password"))?;
    let Some(mut user) = db::users::find_user_by_email(conn, &email).await? else {
        return Err(ServiceError::InvalidCredentials);
    };
    if !verify_password(argon2, &user.password, &password) {
        return Err(ServiceError::InvalidCredentials);
    }
    let at = db::now();
    db::users::touch_last_login(conn, user.id, at).await?;
    user.last_login_at = at;
    let roles = db::users::roles_for_user(conn, user.id).await?;
    info!(user_id = user.id, "login succeeded");

    Ok(Session {
        token: signer.issue(user.id, Utc::now()),
        user: UserView::build(&user, &roles)?,
    })
}

/// Resolve a bearer token to the current caller.
///
/// Roles are always read from the store, never from the token.
///
/// # Errors
/// Returns [`ServiceError::Unauthenticated`] for malformed, forged or
/// expired tokens and for tokens naming a deleted user.
pub async fn resolve(
    conn: &mut DbConnection,
    signer: &TokenSigner,
    token: &str,
    now: DateTime<Utc>,
) -> ServiceResult<Caller> {
    let claims = signer.verify(token, now).map_err(|err| {
        debug!(%err, "bearer token rejected");
        ServiceError::Unauthenticated
    })?;
    load_caller(conn, claims.user_id)
        .await?
        .ok_or(ServiceError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Alice@Example.COM", "alice@example.com")]
    #[case("  bob@example.com ", "bob@example.com")]
    fn emails_are_trimmed_and_lowercased(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_email(raw), expected);
    }
}

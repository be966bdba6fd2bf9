//! Resource services.
//!
//! Each submodule validates request input, applies the role and ownership
//! rules from [`crate::access`], mutates the store through [`crate::db`] and
//! returns projections from [`crate::views`]. Services borrow a connection
//! and know nothing about HTTP.

pub mod auth;
pub mod categories;
pub mod channels;
pub mod events;
pub mod learning;
pub mod miles;
pub mod posts;
pub mod roles;
pub mod shop;
pub mod users;

use std::collections::HashMap;

pub use miles::Ledger;

use crate::{
    access::Principal,
    db::{self, DbConnection},
    error::{ServiceError, ServiceResult},
    kinds::RoleKind,
    models::{Role, User},
    views::UserView,
};

/// Authenticated caller: the stored user, its roles and the derived principal.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
    pub roles: Vec<Role>,
    pub principal: Principal,
}

impl Caller {
    /// Project the caller for a response body.
    ///
    /// # Errors
    /// Fails when a stored role no longer decodes.
    pub fn view(&self) -> ServiceResult<UserView> { UserView::build(&self.user, &self.roles) }
}

/// Build a principal from stored role rows.
///
/// # Errors
/// Returns [`ServiceError::Internal`] when a stored role kind is unknown.
pub fn principal_for(user_id: i32, roles: &[Role]) -> ServiceResult<Principal> {
    let pairs = roles
        .iter()
        .map(|role| {
            role.kind
                .parse::<RoleKind>()
                .map(|kind| (role.id, kind))
                .map_err(|e| ServiceError::corrupt(&e))
        })
        .collect::<ServiceResult<Vec<_>>>()?;
    Ok(Principal::new(user_id, pairs))
}

/// Load a user together with its current roles.
///
/// # Errors
/// Returns any database error; a missing user yields `Ok(None)`.
pub async fn load_caller(conn: &mut DbConnection, user_id: i32) -> ServiceResult<Option<Caller>> {
    let Some(user) = db::users::find_user(conn, user_id).await? else {
        return Ok(None);
    };
    let roles = db::users::roles_for_user(conn, user_id).await?;
    let principal = principal_for(user_id, &roles)?;
    Ok(Some(Caller {
        user,
        roles,
        principal,
    }))
}

/// Project a single user, loading its roles.
///
/// # Errors
/// Returns any database or decoding error.
pub async fn user_view(conn: &mut DbConnection, user: &User) -> ServiceResult<UserView> {
    let roles = db::users::roles_for_user(conn, user.id).await?;
    UserView::build(user, &roles)
}

/// Users referenced by `ids`, keyed by id.
pub(crate) async fn users_by_id(
    conn: &mut DbConnection,
    ids: impl IntoIterator<Item = i32>,
) -> ServiceResult<HashMap<i32, User>> {
    let mut ids: Vec<i32> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    let users = db::users::users_by_ids(conn, &ids).await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

/// Look up a referenced user that must exist.
pub(crate) fn referenced<'a>(users: &'a HashMap<i32, User>, id: i32) -> ServiceResult<&'a User> {
    users
        .get(&id)
        .ok_or_else(|| ServiceError::Internal(format!("dangling user reference {id}")))
}

/// Trimmed value of a required text field.
pub(crate) fn required(field: &str, value: Option<String>) -> ServiceResult<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_owned()),
        _ => Err(ServiceError::missing(field)),
    }
}

/// Trimmed replacement for an optional text field; blank input is rejected.
pub(crate) fn non_blank(field: &str, value: Option<String>) -> ServiceResult<Option<String>> {
    value.map(|v| required(field, Some(v))).transpose()
}

/// Blank optional text becomes `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Reject negative integers.
pub(crate) fn non_negative(field: &str, value: i32) -> ServiceResult<i32> {
    if value < 0 {
        return Err(ServiceError::Validation(format!(
            "{field} must not be negative"
        )));
    }
    Ok(value)
}

/// Sorted, de-duplicated id list.
pub(crate) fn unique_ids(ids: &[i32]) -> Vec<i32> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Treat an affected-row count of zero as a missing resource.
pub(crate) fn found(rows: usize, what: &str) -> ServiceResult<()> {
    if rows == 0 {
        Err(ServiceError::not_found(what))
    } else {
        Ok(())
    }
}

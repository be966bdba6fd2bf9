//! User record and role membership queries.

use chrono::NaiveDateTime;
use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::{
    models::{NewUser, NotificationChanges, ProfileChanges, Role, User, UserRole},
    schema::{roles, user_roles, users},
};

/// Look up a user by primary key.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_user(conn: &mut DbConnection, user_id: i32) -> QueryResult<Option<User>> {
    users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .await
        .optional()
}

/// Look up a user by normalised email address.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_user_by_email(
    conn: &mut DbConnection,
    email: &str,
) -> QueryResult<Option<User>> {
    users::table
        .filter(users::email.eq(email))
        .select(User::as_select())
        .first(conn)
        .await
        .optional()
}

/// All users, newest registration first.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn list_users(conn: &mut DbConnection) -> QueryResult<Vec<User>> {
    users::table
        .order((users::registered_at.desc(), users::id.desc()))
        .select(User::as_select())
        .load(conn)
        .await
}

/// Fetch the users whose ids appear in `ids`.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn users_by_ids(conn: &mut DbConnection, ids: &[i32]) -> QueryResult<Vec<User>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    users::table
        .filter(users::id.eq_any(ids))
        .select(User::as_select())
        .load(conn)
        .await
}

/// Insert a new user record.
///
/// # Errors
/// Returns any error produced by the insertion query, including unique
/// violations on the email column.
#[must_use = "handle the result"]
pub async fn create_user(conn: &mut DbConnection, user: &NewUser<'_>) -> QueryResult<User> {
    diesel::insert_into(users::table)
        .values(user)
        .returning(User::as_returning())
        .get_result(conn)
        .await
}

/// Record a successful login.
///
/// # Errors
/// Returns any error produced by the update query.
#[must_use = "handle the result"]
pub async fn touch_last_login(
    conn: &mut DbConnection,
    user_id: i32,
    at: NaiveDateTime,
) -> QueryResult<usize> {
    diesel::update(users::table.find(user_id))
        .set(users::last_login_at.eq(at))
        .execute(conn)
        .await
}

/// Merge profile fields into the stored user.
///
/// # Errors
/// Returns any error produced by the update query.
#[must_use = "handle the result"]
pub async fn update_profile(
    conn: &mut DbConnection,
    user_id: i32,
    changes: &ProfileChanges,
) -> QueryResult<Option<User>> {
    if changes.is_empty() {
        return find_user(conn, user_id).await;
    }
    diesel::update(users::table.find(user_id))
        .set(changes)
        .returning(User::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// Replace the notification preference flags.
///
/// # Errors
/// Returns any error produced by the update query.
#[must_use = "handle the result"]
pub async fn update_notifications(
    conn: &mut DbConnection,
    user_id: i32,
    changes: NotificationChanges,
) -> QueryResult<Option<User>> {
    diesel::update(users::table.find(user_id))
        .set(changes)
        .returning(User::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// Delete a user; owned rows cascade.
///
/// # Errors
/// Returns a foreign key violation when the user still created events or
/// learning articles.
#[must_use = "handle the result"]
pub async fn delete_user(conn: &mut DbConnection, user_id: i32) -> QueryResult<usize> {
    diesel::delete(users::table.find(user_id)).execute(conn).await
}

/// Roles held by a user in creation order.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn roles_for_user(conn: &mut DbConnection, user_id: i32) -> QueryResult<Vec<Role>> {
    user_roles::table
        .inner_join(roles::table)
        .filter(user_roles::user_id.eq(user_id))
        .order((roles::created_at.asc(), roles::id.asc()))
        .select(Role::as_select())
        .load(conn)
        .await
}

/// `(user id, role)` pairs for every user in `ids`.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn roles_for_users(
    conn: &mut DbConnection,
    ids: &[i32],
) -> QueryResult<Vec<(i32, Role)>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    user_roles::table
        .inner_join(roles::table)
        .filter(user_roles::user_id.eq_any(ids))
        .order((roles::created_at.asc(), roles::id.asc()))
        .select((user_roles::user_id, Role::as_select()))
        .load(conn)
        .await
}

/// Add a role to a user; granting a held role is a no-op.
///
/// # Errors
/// Returns a foreign key violation when either side does not exist.
#[must_use = "handle the result"]
pub async fn grant_role(conn: &mut DbConnection, user_id: i32, role_id: i32) -> QueryResult<usize> {
    diesel::insert_into(user_roles::table)
        .values(UserRole { user_id, role_id })
        .on_conflict_do_nothing()
        .execute(conn)
        .await
}

/// Remove a role from a user.
///
/// # Errors
/// Returns any error produced by the delete query.
#[must_use = "handle the result"]
pub async fn revoke_role(
    conn: &mut DbConnection,
    user_id: i32,
    role_id: i32,
) -> QueryResult<usize> {
    diesel::delete(
        user_roles::table
            .filter(user_roles::user_id.eq(user_id))
            .filter(user_roles::role_id.eq(role_id)),
    )
    .execute(conn)
    .await
}

//! Role queries.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::{
    models::{NewRole, Role, RoleChanges},
    schema::roles,
};

/// Roles in ascending creation order.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn list_roles(conn: &mut DbConnection) -> QueryResult<Vec<Role>> {
    roles::table
        .order((roles::created_at.asc(), roles::id.asc()))
        .select(Role::as_select())
        .load(conn)
        .await
}

/// Look up a role by primary key.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_role(conn: &mut DbConnection, role_id: i32) -> QueryResult<Option<Role>> {
    roles::table
        .find(role_id)
        .select(Role::as_select())
        .first(conn)
        .await
        .optional()
}

/// Look up a role by its unique name.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_role_by_name(conn: &mut DbConnection, name: &str) -> QueryResult<Option<Role>> {
    roles::table
        .filter(roles::name.eq(name))
        .select(Role::as_select())
        .first(conn)
        .await
        .optional()
}

/// Oldest role of the given kind.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_role_by_kind(conn: &mut DbConnection, kind: &str) -> QueryResult<Option<Role>> {
    roles::table
        .filter(roles::kind.eq(kind))
        .order(roles::id.asc())
        .select(Role::as_select())
        .first(conn)
        .await
        .optional()
}

/// Count how many of `ids` name existing roles.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn count_roles_in(conn: &mut DbConnection, ids: &[i32]) -> QueryResult<i64> {
    if ids.is_empty() {
        return Ok(0);
    }
    roles::table
        .filter(roles::id.eq_any(ids))
        .count()
        .get_result(conn)
        .await
}

/// Insert a new role.
///
/// # Errors
/// Returns a unique violation when the name is taken.
#[must_use = "handle the result"]
pub async fn create_role(conn: &mut DbConnection, role: &NewRole<'_>) -> QueryResult<Role> {
    diesel::insert_into(roles::table)
        .values(role)
        .returning(Role::as_returning())
        .get_result(conn)
        .await
}

/// Apply a partial update to a role.
///
/// # Errors
/// Returns any error produced by the update query.
#[must_use = "handle the result"]
pub async fn update_role(
    conn: &mut DbConnection,
    role_id: i32,
    changes: &RoleChanges,
) -> QueryResult<Option<Role>> {
    if changes.is_empty() {
        return find_role(conn, role_id).await;
    }
    diesel::update(roles::table.find(role_id))
        .set(changes)
        .returning(Role::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// Delete a role; memberships and channel permissions cascade.
///
/// # Errors
/// Returns any error produced by the delete query.
#[must_use = "handle the result"]
pub async fn delete_role(conn: &mut DbConnection, role_id: i32) -> QueryResult<usize> {
    diesel::delete(roles::table.find(role_id)).execute(conn).await
}

//! Channel and channel permission queries.

use diesel::{prelude::*, result::QueryResult};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;
use crate::{
    kinds::PermissionAccess,
    models::{Category, Channel, ChannelChanges, ChannelPermission, NewChannel, Role},
    schema::{categories, channel_permissions, channels, roles},
};

/// Channels with their categories ordered by `(category order, channel order)`.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn list_channels(
    conn: &mut DbConnection,
    category_id: Option<i32>,
) -> QueryResult<Vec<(Channel, Category)>> {
    let mut query = channels::table
        .inner_join(categories::table)
        .order((
            categories::position.asc(),
            categories::id.asc(),
            channels::position.asc(),
            channels::id.asc(),
        ))
        .select((Channel::as_select(), Category::as_select()))
        .into_boxed();
    if let Some(category_id) = category_id {
        query = query.filter(channels::category_id.eq(category_id));
    }
    query.load(conn).await
}

/// Look up a channel with its category.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn find_channel(
    conn: &mut DbConnection,
    channel_id: i32,
) -> QueryResult<Option<(Channel, Category)>> {
    channels::table
        .inner_join(categories::table)
        .filter(channels::id.eq(channel_id))
        .select((Channel::as_select(), Category::as_select()))
        .first(conn)
        .await
        .optional()
}

/// Insert a new channel row.
///
/// # Errors
/// Returns a foreign key violation when the category does not exist.
#[must_use = "handle the result"]
pub async fn create_channel(conn: &mut DbConnection, channel: &NewChannel<'_>) -> QueryResult<Channel> {
    diesel::insert_into(channels::table)
        .values(channel)
        .returning(Channel::as_returning())
        .get_result(conn)
        .await
}

/// Apply a partial update to a channel row.
///
/// # Errors
/// Returns any error produced by the update query.
#[must_use = "handle the result"]
pub async fn update_channel(
    conn: &mut DbConnection,
    channel_id: i32,
    changes: &ChannelChanges,
) -> QueryResult<usize> {
    if changes.is_empty() {
        return channels::table
            .filter(channels::id.eq(channel_id))
            .count()
            .get_result::<i64>(conn)
            .await
            .map(|n| usize::from(n > 0));
    }
    diesel::update(channels::table.find(channel_id))
        .set(changes)
        .execute(conn)
        .await
}

/// Delete a channel; its posts and permissions cascade.
///
/// # Errors
/// Returns any error produced by the delete query.
#[must_use = "handle the result"]
pub async fn delete_channel(conn: &mut DbConnection, channel_id: i32) -> QueryResult<usize> {
    diesel::delete(channels::table.find(channel_id))
        .execute(conn)
        .await
}

/// Permission entries joined with their roles for the given channels.
///
/// # Errors
/// Returns any error produced by the underlying database query.
#[must_use = "handle the result"]
pub async fn permissions_for_channels(
    conn: &mut DbConnection,
    channel_ids: &[i32],
) -> QueryResult<Vec<(ChannelPermission, Role)>> {
    if channel_ids.is_empty() {
        return Ok(Vec::new());
    }
    channel_permissions::table
        .inner_join(roles::table)
        .filter(channel_permissions::channel_id.eq_any(channel_ids))
        .order((roles::created_at.asc(), roles::id.asc()))
        .select((ChannelPermission::as_select(), Role::as_select()))
        .load(conn)
        .await
}

/// Replace one access list of a channel.
///
/// # Errors
/// Returns a foreign key violation when a role does not exist.
#[must_use = "handle the result"]
pub async fn replace_permissions(
    conn: &mut DbConnection,
    channel_id: i32,
    access: PermissionAccess,
    role_ids: &[i32],
) -> QueryResult<usize> {
    diesel::delete(
        channel_permissions::table
            .filter(channel_permissions::channel_id.eq(channel_id))
            .filter(channel_permissions::access.eq(access.as_str())),
    )
    .execute(conn)
    .await?;
    if role_ids.is_empty() {
        return Ok(0);
    }
    let rows: Vec<ChannelPermission> = role_ids
        .iter()
        .map(|role_id| ChannelPermission {
            channel_id,
            role_id: *role_id,
            access: access.as_str().to_owned(),
        })
        .collect();
    diesel::insert_into(channel_permissions::table)
        .values(&rows)
        .on_conflict_do_nothing()
        .execute(conn)
        .await
}

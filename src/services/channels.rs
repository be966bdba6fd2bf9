//! Channel listing, gating and administration.
//!
//! A channel's view and post lists are stored as permission rows. Listing
//! for a caller filters by [`can_view`] and annotates every visible channel
//! with [`can_post`]; the administrative listing skips both.

use std::collections::HashMap;

use diesel_async::AsyncConnection;
use serde::Deserialize;
use tracing::info;

use super::{non_blank, required, unique_ids};
use crate::{
    access::{ChannelAccess, Principal, can_post, can_view, require_admin},
    db::{self, DbConnection},
    error::{ServiceError, ServiceResult},
    kinds::PermissionAccess,
    models::{Category, Channel, ChannelChanges, NewChannel},
    views::{CategoryView, ChannelView, RoleSummary},
};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub view_permissions: Option<Vec<i32>>,
    pub post_permissions: Option<Vec<i32>>,
    pub order: Option<i32>,
}

#[derive(Default)]
struct Lists {
    view: Vec<RoleSummary>,
    post: Vec<RoleSummary>,
    access: ChannelAccess,
}

async fn permission_lists(
    conn: &mut DbConnection,
    channel_ids: &[i32],
) -> ServiceResult<HashMap<i32, Lists>> {
    let mut lists: HashMap<i32, Lists> = HashMap::new();
    for (perm, role) in db::channels::permissions_for_channels(conn, channel_ids).await? {
        let entry = lists.entry(perm.channel_id).or_default();
        match perm.access.parse::<PermissionAccess>() {
            Ok(PermissionAccess::View) => {
                entry.access.view.insert(role.id);
                entry.view.push(RoleSummary::from(&role));
            }
            Ok(PermissionAccess::Post) => {
                entry.access.post.insert(role.id);
                entry.post.push(RoleSummary::from(&role));
            }
            Err(e) => return Err(ServiceError::corrupt(&e)),
        }
    }
    Ok(lists)
}

async fn project(
    conn: &mut DbConnection,
    rows: Vec<(Channel, Category)>,
) -> ServiceResult<Vec<(ChannelView, ChannelAccess)>> {
    let ids: Vec<i32> = rows.iter().map(|(c, _)| c.id).collect();
    let mut lists = permission_lists(conn, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|(channel, category)| {
            let Lists { view, post, access } = lists.remove(&channel.id).unwrap_or_default();
            let view = ChannelView {
                id: channel.id,
                name: channel.name,
                description: channel.description,
                category: CategoryView::from(&category),
                view_permissions: view,
                post_permissions: post,
                order: channel.position,
                created_at: channel.created_at.and_utc(),
                can_post: None,
            };
            (view, access)
        })
        .collect())
}

/// Channels the caller may view, annotated with `canPost`.
///
/// # Errors
/// Returns any database or decoding error.
pub async fn list_for(
    conn: &mut DbConnection,
    who: &Principal,
    category_id: Option<i32>,
) -> ServiceResult<Vec<ChannelView>> {
    let rows = db::channels::list_channels(conn, category_id).await?;
    Ok(project(conn, rows)
        .await?
        .into_iter()
        .filter(|(_, access)| can_view(who, access))
        .map(|(mut view, access)| {
            view.can_post = Some(can_post(who, &access));
            view
        })
        .collect())
}

/// Every channel regardless of permissions.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers.
pub async fn list_all(conn: &mut DbConnection, who: &Principal) -> ServiceResult<Vec<ChannelView>> {
    require_admin(who)?;
    let rows = db::channels::list_channels(conn, None).await?;
    Ok(project(conn, rows).await?.into_iter().map(|(v, _)| v).collect())
}

/// Permission lists of one channel.
///
/// # Errors
/// Returns `NotFound` when the channel does not exist.
pub async fn access_for(conn: &mut DbConnection, channel_id: i32) -> ServiceResult<ChannelAccess> {
    if db::channels::find_channel(conn, channel_id).await?.is_none() {
        return Err(ServiceError::not_found("channel"));
    }
    Ok(permission_lists(conn, &[channel_id])
        .await?
        .remove(&channel_id)
        .map(|lists| lists.access)
        .unwrap_or_default())
}

async fn channel_view(conn: &mut DbConnection, channel_id: i32) -> ServiceResult<ChannelView> {
    let row = db::channels::find_channel(conn, channel_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("channel"))?;
    project(conn, vec![row])
        .await?
        .pop()
        .map(|(view, _)| view)
        .ok_or_else(|| ServiceError::not_found("channel"))
}

async fn validate_references(
    conn: &mut DbConnection,
    category_id: Option<i32>,
    lists: [Option<&Vec<i32>>; 2],
) -> ServiceResult<()> {
    if let Some(category_id) = category_id {
        if db::categories::find_category(conn, category_id).await?.is_none() {
            return Err(ServiceError::Validation(
                "category does not exist".to_owned(),
            ));
        }
    }
    for ids in lists.into_iter().flatten() {
        let ids = unique_ids(ids);
        let known = db::roles::count_roles_in(conn, &ids).await?;
        if usize::try_from(known).ok() != Some(ids.len()) {
            return Err(ServiceError::Validation(
                "permission lists reference unknown roles".to_owned(),
            ));
        }
    }
    Ok(())
}

/// Create a channel with its permission lists.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `Validation` for missing
/// fields or references to unknown categories or roles.
pub async fn create_channel(
    conn: &mut DbConnection,
    who: &Principal,
    input: ChannelInput,
) -> ServiceResult<ChannelView> {
    require_admin(who)?;
    let name = required("name", input.name)?;
    let category_id = input
        .category_id
        .ok_or_else(|| ServiceError::missing("categoryId"))?;
    let view_ids = unique_ids(input.view_permissions.as_deref().unwrap_or_default());
    let post_ids = unique_ids(input.post_permissions.as_deref().unwrap_or_default());
    validate_references(conn, Some(category_id), [Some(&view_ids), Some(&post_ids)]).await?;

    let description = input.description.unwrap_or_default();
    let position = input.order.unwrap_or_default();
    let channel_id = conn
        .transaction::<_, ServiceError, _>(|conn| {
            Box::pin(async move {
                let channel = db::channels::create_channel(
                    conn,
                    &NewChannel {
                        category_id,
                        name: &name,
                        description: &description,
                        position,
                        created_at: db::now(),
                    },
                )
                .await?;
                db::channels::replace_permissions(conn, channel.id, PermissionAccess::View, &view_ids)
                    .await?;
                db::channels::replace_permissions(conn, channel.id, PermissionAccess::Post, &post_ids)
                    .await?;
                Ok(channel.id)
            })
        })
        .await?;
    info!(channel_id, "channel created");
    channel_view(conn, channel_id).await
}

/// Apply a partial update; omitted permission lists stay untouched.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers, `NotFound` for unknown ids and
/// `Validation` for references to unknown categories or roles.
pub async fn update_channel(
    conn: &mut DbConnection,
    who: &Principal,
    channel_id: i32,
    input: ChannelInput,
) -> ServiceResult<ChannelView> {
    require_admin(who)?;
    let view_ids = input.view_permissions.as_deref().map(unique_ids);
    let post_ids = input.post_permissions.as_deref().map(unique_ids);
    validate_references(conn, input.category_id, [view_ids.as_ref(), post_ids.as_ref()]).await?;
    let changes = ChannelChanges {
        category_id: input.category_id,
        name: non_blank("name", input.name)?,
        description: input.description,
        position: input.order,
    };

    conn.transaction::<_, ServiceError, _>(|conn| {
        Box::pin(async move {
            if db::channels::update_channel(conn, channel_id, &changes).await? == 0 {
                return Err(ServiceError::not_found("channel"));
            }
            if let Some(ids) = &view_ids {
                db::channels::replace_permissions(conn, channel_id, PermissionAccess::View, ids)
                    .await?;
            }
            if let Some(ids) = &post_ids {
                db::channels::replace_permissions(conn, channel_id, PermissionAccess::Post, ids)
                    .await?;
            }
            Ok(())
        })
    })
    .await?;
    channel_view(conn, channel_id).await
}

/// Delete a channel and its posts.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `NotFound` for unknown ids.
pub async fn delete_channel(
    conn: &mut DbConnection,
    who: &Principal,
    channel_id: i32,
) -> ServiceResult<()> {
    require_admin(who)?;
    super::found(db::channels::delete_channel(conn, channel_id).await?, "channel")?;
    info!(channel_id, "channel deleted");
    Ok(())
}

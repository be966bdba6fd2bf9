//! User directory, profile and role membership operations.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::info;

use super::{Caller, non_blank, principal_for, user_view};
use crate::{
    access::{Principal, require_admin},
    db::{self, DbConnection},
    error::{ServiceError, ServiceResult},
    models::{NotificationChanges, ProfileChanges, Role, User},
    views::{MemberView, NotificationSettings, UserView},
};

/// Profile fields accepted by [`update_profile`]; omitted fields are kept.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub avatar_url: Option<String>,
    pub native_language: Option<String>,
    pub learning_languages: Option<Vec<String>>,
    pub current_country: Option<String>,
    pub status_message: Option<String>,
    pub bio: Option<String>,
    pub instagram: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ProfileInput {
    pub username: Option<String>,
    pub profile: Option<ProfileFields>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NotificationInput {
    pub push_notification_settings: Option<NotificationSettings>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GrantInput {
    pub role_id: Option<i32>,
}

fn group_roles(pairs: Vec<(i32, Role)>) -> HashMap<i32, Vec<Role>> {
    let mut by_user: HashMap<i32, Vec<Role>> = HashMap::new();
    for (user_id, role) in pairs {
        by_user.entry(user_id).or_default().push(role);
    }
    by_user
}

async fn users_with_roles(conn: &mut DbConnection) -> ServiceResult<Vec<(User, Vec<Role>)>> {
    let users = db::users::list_users(conn).await?;
    let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
    let mut roles = group_roles(db::users::roles_for_users(conn, &ids).await?);
    Ok(users
        .into_iter()
        .map(|user| {
            let held = roles.remove(&user.id).unwrap_or_default();
            (user, held)
        })
        .collect())
}

/// Every account, newest registration first.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers.
pub async fn list_users(conn: &mut DbConnection, who: &Principal) -> ServiceResult<Vec<UserView>> {
    require_admin(who)?;
    users_with_roles(conn)
        .await?
        .iter()
        .map(|(user, roles)| UserView::build(user, roles))
        .collect()
}

/// The member directory: every account that is not visitor-only.
///
/// # Errors
/// Returns `Forbidden` when the caller is visitor-only.
pub async fn list_members(
    conn: &mut DbConnection,
    who: &Principal,
) -> ServiceResult<Vec<MemberView>> {
    if who.is_visitor_only() {
        return Err(ServiceError::forbidden(
            "visitors may not browse the member list",
        ));
    }
    let mut members = Vec::new();
    for (user, roles) in users_with_roles(conn).await? {
        if !principal_for(user.id, &roles)?.is_visitor_only() {
            members.push(MemberView::build(&user, &roles));
        }
    }
    Ok(members)
}

/// One account by id.
///
/// # Errors
/// Returns `NotFound` for an unknown id.
pub async fn get_user(conn: &mut DbConnection, user_id: i32) -> ServiceResult<UserView> {
    let user = db::users::find_user(conn, user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("user"))?;
    user_view(conn, &user).await
}

/// Merge profile fields into the caller's account.
///
/// # Errors
/// Returns `Validation` for a blank username.
pub async fn update_profile(
    conn: &mut DbConnection,
    caller: &Caller,
    input: ProfileInput,
) -> ServiceResult<UserView> {
    let profile = input.profile.unwrap_or_default();
    let learning_languages = profile
        .learning_languages
        .map(|langs| serde_json::to_string(&langs))
        .transpose()?;
    let changes = ProfileChanges {
        username: non_blank("username", input.username)?,
        avatar_url: profile.avatar_url,
        native_language: profile.native_language,
        learning_languages,
        current_country: profile.current_country,
        status_message: profile.status_message,
        bio: profile.bio,
        instagram: profile.instagram,
    };
    let user = db::users::update_profile(conn, caller.user.id, &changes)
        .await?
        .ok_or_else(|| ServiceError::not_found("user"))?;
    UserView::build(&user, &caller.roles)
}

/// Replace the caller's notification flags.
///
/// # Errors
/// Returns `Validation` when the settings object is missing.
pub async fn update_notifications(
    conn: &mut DbConnection,
    caller: &Caller,
    input: NotificationInput,
) -> ServiceResult<UserView> {
    let settings = input
        .push_notification_settings
        .ok_or_else(|| ServiceError::missing("pushNotificationSettings"))?;
    let changes = NotificationChanges {
        notify_event_reminders: settings.event_reminders,
        notify_new_posts: settings.new_posts,
        notify_new_learning: settings.new_learning,
    };
    let user = db::users::update_notifications(conn, caller.user.id, changes)
        .await?
        .ok_or_else(|| ServiceError::not_found("user"))?;
    UserView::build(&user, &caller.roles)
}

async fn remove_account(conn: &mut DbConnection, user_id: i32) -> ServiceResult<()> {
    match db::users::delete_user(conn, user_id).await {
        Ok(0) => Err(ServiceError::not_found("user")),
        Ok(_) => {
            info!(user_id, "account deleted");
            Ok(())
        }
        Err(err) => match ServiceError::from(err) {
            ServiceError::Conflict(_) => Err(ServiceError::Conflict(
                "the account still owns events or learning articles".to_owned(),
            )),
            other => Err(other),
        },
    }
}

/// Delete the caller's own account.
///
/// # Errors
/// Returns `Conflict` while the caller is still the creator of events or
/// learning articles.
pub async fn delete_own_account(conn: &mut DbConnection, who: &Principal) -> ServiceResult<()> {
    remove_account(conn, who.user_id).await
}

/// Delete any account.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `NotFound` for unknown ids.
pub async fn delete_user(conn: &mut DbConnection, who: &Principal, user_id: i32) -> ServiceResult<()> {
    require_admin(who)?;
    remove_account(conn, user_id).await
}

async fn require_user_and_role(
    conn: &mut DbConnection,
    user_id: i32,
    role_id: i32,
) -> ServiceResult<User> {
    let user = db::users::find_user(conn, user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("user"))?;
    if db::roles::find_role(conn, role_id).await?.is_none() {
        return Err(ServiceError::not_found("role"));
    }
    Ok(user)
}

/// Add a role to an account; granting a held role changes nothing.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `NotFound` for an unknown
/// user or role.
pub async fn grant_role(
    conn: &mut DbConnection,
    who: &Principal,
    user_id: i32,
    input: GrantInput,
) -> ServiceResult<UserView> {
    require_admin(who)?;
    let role_id = input.role_id.ok_or_else(|| ServiceError::missing("roleId"))?;
    let user = require_user_and_role(conn, user_id, role_id).await?;
    if db::users::grant_role(conn, user_id, role_id).await? > 0 {
        info!(user_id, role_id, granted_by = who.user_id, "role granted");
    }
    user_view(conn, &user).await
}

/// Remove a role from an account.
///
/// # Errors
/// Returns `Forbidden` for non-admin callers and `NotFound` for an unknown
/// user or role.
pub async fn revoke_role(
    conn: &mut DbConnection,
    who: &Principal,
    user_id: i32,
    role_id: i32,
) -> ServiceResult<UserView> {
    require_admin(who)?;
    let user = require_user_and_role(conn, user_id, role_id).await?;
    if db::users::revoke_role(conn, user_id, role_id).await? > 0 {
        info!(user_id, role_id, revoked_by = who.user_id, "role revoked");
    }
    user_view(conn, &user).await
}

//! Account listing, profile maintenance and role membership.

use axum::{
    Json,
    Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};

use super::{AppState, error::ApiResult, extract::JsonBody};
use crate::services::{
    Caller,
    users::{self, GrantInput, NotificationInput, ProfileInput},
};

async fn list(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let users = users::list_users(&mut conn, &caller.principal).await?;
    Ok(Json(json!({ "users": users })))
}

async fn members(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let members = users::list_members(&mut conn, &caller.principal).await?;
    Ok(Json(json!({ "members": members })))
}

async fn show(
    State(state): State<AppState>,
    _caller: Caller,
    Path(user_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let user = users::get_user(&mut conn, user_id).await?;
    Ok(Json(json!({ "user": user })))
}

async fn update_profile(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<ProfileInput>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let user = users::update_profile(&mut conn, &caller, input).await?;
    Ok(Json(json!({ "message": "Profile updated", "user": user })))
}

async fn update_notifications(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<NotificationInput>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let user = users::update_notifications(&mut conn, &caller, input).await?;
    Ok(Json(json!({ "message": "Notification settings updated", "user": user })))
}

async fn delete_own_account(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    users::delete_own_account(&mut conn, &caller.principal).await?;
    Ok(Json(json!({ "message": "Account deleted" })))
}

async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    users::delete_user(&mut conn, &caller.principal, user_id).await?;
    Ok(Json(json!({ "message": "User deleted" })))
}

async fn grant_role(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<i32>,
    JsonBody(input): JsonBody<GrantInput>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let user = users::grant_role(&mut conn, &caller.principal, user_id, input).await?;
    Ok(Json(json!({ "message": "Role granted", "user": user })))
}

async fn revoke_role(
    State(state): State<AppState>,
    caller: Caller,
    Path((user_id, role_id)): Path<(i32, i32)>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let user = users::revoke_role(&mut conn, &caller.principal, user_id, role_id).await?;
    Ok(Json(json!({ "message": "Role revoked", "user": user })))
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list))
        .route("/users/members", get(members))
        .route("/users/profile", put(update_profile))
        .route("/users/settings/notifications", put(update_notifications))
        .route("/users/me/account", delete(delete_own_account))
        .route("/users/:id", get(show).delete(remove))
        .route("/users/:id/roles", post(grant_role))
        .route("/users/:id/roles/:role_id", delete(revoke_role))
}

use axum::{
    Json,
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde_json::{Value, json};

use super::{AppState, error::ApiResult, extract::JsonBody};
use crate::services::{
    Caller,
    roles::{self, RoleInput},
};

async fn list(State(state): State<AppState>, _caller: Caller) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let roles = roles::list_roles(&mut conn).await?;
    Ok(Json(json!({ "roles": roles })))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<RoleInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut conn = state.pool.get().await?;
    let role = roles::create_role(&mut conn, &caller.principal, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Role created", "role": role })),
    ))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(role_id): Path<i32>,
    JsonBody(input): JsonBody<RoleInput>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let role = roles::update_role(&mut conn, &caller.principal, role_id, input).await?;
    Ok(Json(json!({ "message": "Role updated", "role": role })))
}

async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    Path(role_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    roles::delete_role(&mut conn, &caller.principal, role_id).await?;
    Ok(Json(json!({ "message": "Role deleted" })))
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list).post(create))
        .route("/roles/:id", put(update).delete(remove))
}

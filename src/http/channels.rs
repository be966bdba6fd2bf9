use axum::{
    Json,
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, error::ApiResult, extract::JsonBody};
use crate::services::{
    Caller,
    channels::{self, ChannelInput},
};

#[derive(Deserialize, Debug, Default)]
struct ChannelFilter {
    category: Option<i32>,
}

async fn list(
    State(state): State<AppState>,
    caller: Caller,
    Query(filter): Query<ChannelFilter>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let channels = channels::list_for(&mut conn, &caller.principal, filter.category).await?;
    Ok(Json(json!({ "channels": channels })))
}

async fn list_all(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let channels = channels::list_all(&mut conn, &caller.principal).await?;
    Ok(Json(json!({ "channels": channels })))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<ChannelInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut conn = state.pool.get().await?;
    let channel = channels::create_channel(&mut conn, &caller.principal, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Channel created", "channel": channel })),
    ))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(channel_id): Path<i32>,
    JsonBody(input): JsonBody<ChannelInput>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let channel = channels::update_channel(&mut conn, &caller.principal, channel_id, input).await?;
    Ok(Json(json!({ "message": "Channel updated", "channel": channel })))
}

async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    Path(channel_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    channels::delete_channel(&mut conn, &caller.principal, channel_id).await?;
    Ok(Json(json!({ "message": "Channel deleted" })))
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/channels", get(list).post(create))
        .route("/channels/all", get(list_all))
        .route("/channels/:id", put(update).delete(remove))
}

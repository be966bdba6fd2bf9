use axum::{
    Json,
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde_json::{Value, json};

use super::{AppState, error::ApiResult, extract::JsonBody};
use crate::services::{
    Caller,
    shop::{self, ItemInput},
};

async fn list(State(state): State<AppState>, _caller: Caller) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let items = shop::list_items(&mut conn).await?;
    Ok(Json(json!({ "items": items })))
}

async fn list_all(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let items = shop::list_all_items(&mut conn, &caller.principal).await?;
    Ok(Json(json!({ "items": items })))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<ItemInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut conn = state.pool.get().await?;
    let item = shop::create_item(&mut conn, &caller.principal, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Item created", "item": item })),
    ))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(item_id): Path<i32>,
    JsonBody(input): JsonBody<ItemInput>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let item = shop::update_item(&mut conn, &caller.principal, item_id, input).await?;
    Ok(Json(json!({ "message": "Item updated", "item": item })))
}

async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    Path(item_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    shop::delete_item(&mut conn, &caller.principal, item_id).await?;
    Ok(Json(json!({ "message": "Item deleted" })))
}

async fn purchase(
    State(state): State<AppState>,
    caller: Caller,
    Path(item_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let outcome = shop::purchase(&mut conn, &state.ledger, &caller.principal, item_id).await?;
    Ok(Json(json!({
        "message": "Purchase completed",
        "item": outcome.item,
        "remainingMiles": outcome.remaining_miles,
    })))
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/shop", get(list).post(create))
        .route("/shop/all", get(list_all))
        .route("/shop/:id", put(update).delete(remove))
        .route("/shop/:id/purchase", post(purchase))
}

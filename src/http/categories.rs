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
    categories::{self, CategoryInput},
};

async fn list(State(state): State<AppState>, _caller: Caller) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let categories = categories::list_categories(&mut conn).await?;
    Ok(Json(json!({ "categories": categories })))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<CategoryInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut conn = state.pool.get().await?;
    let category = categories::create_category(&mut conn, &caller.principal, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Category created", "category": category })),
    ))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(category_id): Path<i32>,
    JsonBody(input): JsonBody<CategoryInput>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let category =
        categories::update_category(&mut conn, &caller.principal, category_id, input).await?;
    Ok(Json(json!({ "message": "Category updated", "category": category })))
}

async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    Path(category_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    categories::delete_category(&mut conn, &caller.principal, category_id).await?;
    Ok(Json(json!({ "message": "Category deleted" })))
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list).post(create))
        .route("/categories/:id", put(update).delete(remove))
}

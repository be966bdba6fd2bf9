use axum::{
    Json,
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    AppState,
    error::ApiResult,
    extract::{JsonBody, OptionalJsonBody},
};
use crate::services::{
    Caller,
    learning::{self, ArticleInput, CompletionInput},
};

#[derive(Deserialize, Debug, Default)]
struct ArticleFilter {
    category: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    caller: Caller,
    Query(filter): Query<ArticleFilter>,
) -> ApiResult<Json<Value>> {
    let category = learning::category_filter(filter.category.as_deref())?;
    let mut conn = state.pool.get().await?;
    let articles = learning::list_articles(&mut conn, &caller.principal, category).await?;
    Ok(Json(json!({ "articles": articles })))
}

async fn show(
    State(state): State<AppState>,
    caller: Caller,
    Path(article_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let article = learning::get_article(&mut conn, &caller.principal, article_id).await?;
    Ok(Json(json!({ "article": article })))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<ArticleInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut conn = state.pool.get().await?;
    let article = learning::create_article(&mut conn, &caller.principal, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Article created", "article": article })),
    ))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(article_id): Path<i32>,
    JsonBody(input): JsonBody<ArticleInput>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let article = learning::update_article(&mut conn, &caller.principal, article_id, input).await?;
    Ok(Json(json!({ "message": "Article updated", "article": article })))
}

async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    Path(article_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    learning::delete_article(&mut conn, &caller.principal, article_id).await?;
    Ok(Json(json!({ "message": "Article deleted" })))
}

/// The body is optional; without one the default rating applies.
async fn complete(
    State(state): State<AppState>,
    caller: Caller,
    Path(article_id): Path<i32>,
    OptionalJsonBody(input): OptionalJsonBody<CompletionInput>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let outcome =
        learning::complete(&mut conn, &state.ledger, &caller.principal, article_id, input).await?;
    Ok(Json(json!({
        "message": "Article completed",
        "milesEarned": outcome.miles_earned,
        "miles": outcome.balance,
    })))
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/learning", get(list).post(create))
        .route("/learning/:id", get(show).put(update).delete(remove))
        .route("/learning/:id/complete", post(complete))
}

use axum::{
    Json,
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};

use super::{AppState, error::ApiResult, extract::JsonBody};
use crate::services::{
    Caller,
    posts::{self, CommentInput, PostEdit, PostInput},
};

async fn in_channel(
    State(state): State<AppState>,
    caller: Caller,
    Path(channel_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let posts = posts::list_posts(&mut conn, &caller.principal, channel_id).await?;
    Ok(Json(json!({ "posts": posts })))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<PostInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut conn = state.pool.get().await?;
    let post = posts::create_post(&mut conn, &caller.principal, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Post created", "post": post })),
    ))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(post_id): Path<i32>,
    JsonBody(input): JsonBody<PostEdit>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let post = posts::update_post(&mut conn, &caller.principal, post_id, input).await?;
    Ok(Json(json!({ "message": "Post updated", "post": post })))
}

async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    Path(post_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    posts::delete_post(&mut conn, &caller.principal, post_id).await?;
    Ok(Json(json!({ "message": "Post deleted" })))
}

async fn like(
    State(state): State<AppState>,
    caller: Caller,
    Path(post_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let post = posts::toggle_like(&mut conn, &caller.principal, post_id).await?;
    Ok(Json(json!({ "message": "Like toggled", "post": post })))
}

async fn comment(
    State(state): State<AppState>,
    caller: Caller,
    Path(post_id): Path<i32>,
    JsonBody(input): JsonBody<CommentInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut conn = state.pool.get().await?;
    let post = posts::add_comment(&mut conn, &caller.principal, post_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Comment added", "post": post })),
    ))
}

async fn remove_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path((post_id, comment_id)): Path<(i32, i32)>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let post = posts::delete_comment(&mut conn, &caller.principal, post_id, comment_id).await?;
    Ok(Json(json!({ "message": "Comment deleted", "post": post })))
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", post(create))
        .route("/posts/channel/:id", get(in_channel))
        .route("/posts/:id", put(update).delete(remove))
        .route("/posts/:id/like", post(like))
        .route("/posts/:id/comment", post(comment))
        .route("/posts/:id/comment/:comment_id", delete(remove_comment))
}

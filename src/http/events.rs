use axum::{
    Json,
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};

use super::{AppState, error::ApiResult, extract::JsonBody};
use crate::services::{
    Caller,
    events::{self, EventInput, EventRange},
};

async fn list(
    State(state): State<AppState>,
    caller: Caller,
    Query(range): Query<EventRange>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let events = events::list_events(&mut conn, &caller.principal, &range).await?;
    Ok(Json(json!({ "events": events })))
}

async fn show(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let event = events::get_event(&mut conn, &caller.principal, event_id).await?;
    Ok(Json(json!({ "event": event })))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<EventInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut conn = state.pool.get().await?;
    let event = events::create_event(&mut conn, &caller.principal, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Event created", "event": event })),
    ))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<i32>,
    JsonBody(input): JsonBody<EventInput>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let event = events::update_event(&mut conn, &caller.principal, event_id, input).await?;
    Ok(Json(json!({ "message": "Event updated", "event": event })))
}

async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    events::delete_event(&mut conn, &caller.principal, event_id).await?;
    Ok(Json(json!({ "message": "Event deleted" })))
}

async fn participate(
    State(state): State<AppState>,
    caller: Caller,
    Path(event_id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let event = events::toggle_participation(&mut conn, &caller.principal, event_id).await?;
    let message = if event.is_participating == Some(true) {
        "Registered for the event"
    } else {
        "Registration cancelled"
    };
    Ok(Json(json!({ "message": message, "event": event })))
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list).post(create))
        .route("/events/:id", get(show).put(update).delete(remove))
        .route("/events/:id/participate", post(participate))
}

use axum::{
    Json,
    Router,
    extract::State,
    routing::{get, post},
};
use serde_json::{Value, json};

use super::{AppState, error::ApiResult, extract::JsonBody};
use crate::services::{
    Caller,
    miles::{self, GrantInput, SpendInput, TopUpInput},
};

async fn balance(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let miles = miles::balance(&mut conn, &caller.principal).await?;
    Ok(Json(json!({ "miles": miles })))
}

async fn transactions(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let transactions = miles::transactions(&mut conn, &caller.principal).await?;
    Ok(Json(json!({ "transactions": transactions })))
}

async fn purchase(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<TopUpInput>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let miles = miles::top_up(&mut conn, &state.ledger, &caller.principal, input).await?;
    Ok(Json(json!({ "message": "Miles purchased", "miles": miles })))
}

async fn spend(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<SpendInput>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let miles = miles::spend(&mut conn, &state.ledger, &caller.principal, input).await?;
    Ok(Json(json!({ "message": "Miles spent", "miles": miles })))
}

async fn grant(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<GrantInput>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let miles = miles::grant(&mut conn, &state.ledger, &caller.principal, input).await?;
    Ok(Json(json!({ "message": "Miles granted", "miles": miles })))
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/miles/balance", get(balance))
        .route("/miles/transactions", get(transactions))
        .route("/miles/purchase", post(purchase))
        .route("/miles/spend", post(spend))
        .route("/miles/grant", post(grant))
}

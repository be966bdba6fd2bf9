//! Signup, login and session inspection.

use axum::{
    Json,
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};

use super::{AppState, error::ApiResult, extract::JsonBody};
use crate::services::{
    Caller,
    auth::{self, LoginInput, SignupInput},
};

async fn signup(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SignupInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut conn = state.pool.get().await?;
    let session = auth::signup(&mut conn, &state.argon2, &state.signer, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Signup completed",
            "token": session.token,
            "user": session.user,
        })),
    ))
}

async fn login(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<LoginInput>,
) -> ApiResult<Json<Value>> {
    let mut conn = state.pool.get().await?;
    let session = auth::login(&mut conn, &state.argon2, &state.signer, input).await?;
    Ok(Json(json!({
        "message": "Login successful",
        "token": session.token,
        "user": session.user,
    })))
}

async fn me(caller: Caller) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "user": caller.view()? })))
}

async fn verify(caller: Caller) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "valid": true, "user": caller.view()? })))
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/verify", post(verify))
}

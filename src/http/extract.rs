//! Request extractors: the authenticated caller and JSON bodies.

use axum::{
    Json,
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request, rejection::JsonRejection},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use serde::de::DeserializeOwned;

use super::{AppState, error::ApiError};
use crate::{
    error::{ServiceError, ServiceResult},
    services::{Caller, auth},
};

/// Token carried in an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ServiceError::Unauthenticated)?;
        let mut conn = state.pool.get().await?;
        Ok(auth::resolve(&mut conn, &state.signer, token, Utc::now()).await?)
    }
}

/// JSON request body whose rejections render as validation errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// JSON request body that may be omitted entirely.
///
/// An empty or whitespace-only body yields `T::default()`; anything else must
/// decode as `T` or the request fails with a validation error.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalJsonBody<T>(pub T);

fn decode_optional<T: DeserializeOwned + Default>(bytes: &[u8]) -> ServiceResult<T> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes)
        .map_err(|err| ServiceError::Validation(format!("invalid JSON body: {err}")))
}

#[async_trait]
impl<T, S> FromRequest<S> for OptionalJsonBody<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::Validation(rejection.body_text()))?;
        Ok(Self(decode_optional(&bytes)?))
    }
}

//! HTTP surface of the community backend.
//!
//! The router is built from an explicit [`AppState`]; handlers authenticate
//! through the [`Caller`](crate::services::Caller) extractor, delegate to
//! [`crate::services`] and render JSON bodies keyed by resource name.

mod auth;
mod categories;
mod channels;
pub mod error;
mod events;
pub mod extract;
mod learning;
mod miles;
mod posts;
mod roles;
mod shop;
mod users;

use std::sync::Arc;

use argon2::Argon2;
use axum::{
    Json,
    Router,
    body::Body,
    http::Request,
    middleware::{Next, from_fn},
    response::Response,
    routing::get,
};
use serde_json::{Value, json};
use tracing::Instrument;

use crate::{db::DbPool, services::Ledger, token::TokenSigner};

/// Shared application context handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub argon2: Arc<Argon2<'static>>,
    pub signer: Arc<TokenSigner>,
    pub ledger: Arc<Ledger>,
}

impl AppState {
    #[must_use]
    pub fn new(pool: DbPool, argon2: Argon2<'static>, signer: TokenSigner) -> Self {
        Self {
            pool,
            argon2: Arc::new(argon2),
            signer: Arc::new(signer),
            ledger: Arc::new(Ledger::new()),
        }
    }
}

async fn request_tracing(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let span = tracing::info_span!("http.request", method = %method, path = %path);
    let response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| tracing::debug!(status = response.status().as_u16(), "request finished"));
    response
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

/// Build the complete route table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(users::routes())
        .merge(roles::routes())
        .merge(categories::routes())
        .merge(channels::routes())
        .merge(posts::routes())
        .merge(events::routes())
        .merge(learning::routes())
        .merge(miles::routes())
        .merge(shop::routes())
        .layer(from_fn(request_tracing))
        .with_state(state)
}

//! In-process application harness.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::Duration;
use ecg_community::{
    db::{DbPool, apply_migrations, establish_pool},
    http::{AppState, router},
    seed::{BootstrapAdmin, SeedReport, seed},
    token::TokenSigner,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::{AnyError, Session, cheap_argon2};

/// Email of the seeded administrator.
pub const ADMIN_EMAIL: &str = "admin@example.com";
/// Password of the seeded administrator.
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Status and decoded JSON body of one response.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    /// The `error` message of a failed request, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> { self.body.get("error").and_then(Value::as_str) }
}

/// A seeded application bound to a temporary database.
pub struct TestApp {
    router: Router,
    pool: DbPool,
    seeded: SeedReport,
    _temp_dir: TempDir,
}

impl TestApp {
    /// Build, migrate and seed a fresh application.
    ///
    /// # Errors
    /// Returns any failure raised while creating the database or seeding it.
    pub async fn new() -> Result<Self, AnyError> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("ecg-test.db");
        let url = path.to_string_lossy().into_owned();
        let pool = establish_pool(&url).await?;
        let argon2 = cheap_argon2()?;
        let seeded = {
            let mut conn = pool.get().await?;
            apply_migrations(&mut conn, &url).await?;
            let admin = BootstrapAdmin {
                email: ADMIN_EMAIL.to_owned(),
                password: ADMIN_PASSWORD.to_owned(),
                username: "Admin".to_owned(),
            };
            seed(&mut conn, &argon2, Some(&admin)).await?
        };
        tracing::debug!(database = %url, ?seeded, "test application ready");
        let signer = TokenSigner::new(b"integration-test-secret", Duration::days(1))
            .map_err(|err| format!("token signer: {err}"))?;
        Ok(Self {
            router: router(AppState::new(pool.clone(), argon2, signer)),
            pool,
            seeded,
            _temp_dir: temp_dir,
        })
    }

    /// Clone the underlying database pool.
    #[must_use]
    pub fn pool(&self) -> DbPool { self.pool.clone() }

    /// What start-up seeding created.
    #[must_use]
    pub const fn seeded(&self) -> SeedReport { self.seeded }

    /// Send one request through the router.
    ///
    /// # Errors
    /// Returns an error if the request cannot be built or the body is not
    /// JSON.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<Reply, AnyError> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(Reply { status, body })
    }

    /// `GET` with a bearer token.
    ///
    /// # Errors
    /// See [`TestApp::send`].
    pub async fn get(&self, uri: &str, token: &str) -> Result<Reply, AnyError> {
        self.send(Method::GET, uri, Some(token), None).await
    }

    /// `POST` a JSON body with a bearer token.
    ///
    /// # Errors
    /// See [`TestApp::send`].
    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<Reply, AnyError> {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    /// `PUT` a JSON body with a bearer token.
    ///
    /// # Errors
    /// See [`TestApp::send`].
    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Result<Reply, AnyError> {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    /// `DELETE` with a bearer token.
    ///
    /// # Errors
    /// See [`TestApp::send`].
    pub async fn delete(&self, uri: &str, token: &str) -> Result<Reply, AnyError> {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Register a new account and return its session.
    ///
    /// # Errors
    /// Returns an error unless signup answers `201 Created`.
    pub async fn signup(&self, email: &str, username: &str) -> Result<Session, AnyError> {
        let reply = self
            .send(
                Method::POST,
                "/auth/signup",
                None,
                Some(json!({ "email": email, "password": "password", "username": username })),
            )
            .await?;
        if reply.status != StatusCode::CREATED {
            return Err(format!("signup failed with {}: {}", reply.status, reply.body).into());
        }
        Session::from_body(&reply.body)
    }

    /// Log in and return the session.
    ///
    /// # Errors
    /// Returns an error unless login answers `200 OK`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AnyError> {
        let reply = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await?;
        if reply.status != StatusCode::OK {
            return Err(format!("login failed with {}: {}", reply.status, reply.body).into());
        }
        Session::from_body(&reply.body)
    }

    /// Session of the seeded administrator.
    ///
    /// # Errors
    /// See [`TestApp::login`].
    pub async fn admin(&self) -> Result<Session, AnyError> {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Id of the role with the given display name.
    ///
    /// # Errors
    /// Returns an error if the role does not exist.
    pub async fn role_id(&self, token: &str, name: &str) -> Result<i32, AnyError> {
        let reply = self.get("/roles", token).await?;
        reply
            .body
            .get("roles")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|role| role.get("name").and_then(Value::as_str) == Some(name))
            .and_then(|role| role.get("id"))
            .and_then(Value::as_i64)
            .and_then(|id| i32::try_from(id).ok())
            .ok_or_else(|| format!("role {name} not found").into())
    }

    /// Grant the named role to `user_id` as the administrator.
    ///
    /// # Errors
    /// Returns an error unless the grant succeeds.
    pub async fn promote(&self, user_id: i32, role: &str) -> Result<(), AnyError> {
        let admin = self.admin().await?;
        let role_id = self.role_id(&admin.token, role).await?;
        let reply = self
            .post(
                &format!("/users/{user_id}/roles"),
                &admin.token,
                json!({ "roleId": role_id }),
            )
            .await?;
        if reply.status != StatusCode::OK {
            return Err(format!("grant failed with {}: {}", reply.status, reply.body).into());
        }
        Ok(())
    }

    /// Id of the seeded channel with the given name, as seen by the admin.
    ///
    /// # Errors
    /// Returns an error if the channel does not exist.
    pub async fn channel_id(&self, name: &str) -> Result<i32, AnyError> {
        let admin = self.admin().await?;
        let reply = self.get("/channels/all", &admin.token).await?;
        reply
            .body
            .get("channels")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|c| c.get("name").and_then(Value::as_str) == Some(name))
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64)
            .and_then(|id| i32::try_from(id).ok())
            .ok_or_else(|| format!("channel {name} not found").into())
    }
}

//! Signed bearer tokens.
//!
//! A token has the form `<user id>.<expiry unix seconds>.<signature>` where
//! the signature is the hex encoded HMAC-SHA256 of the first two fields. The
//! token proves identity only; roles are always loaded fresh from storage.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac, digest::InvalidLength};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a presented token is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// Claims recovered from a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claims {
    pub user_id: i32,
    pub expires_at: i64,
}

/// Issues and verifies tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Build a signer from `secret`.
    ///
    /// # Errors
    /// Returns [`InvalidLength`] if the MAC rejects the key.
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, InvalidLength> {
        let mac = HmacSha256::new_from_slice(secret)?;
        Ok(Self { mac, ttl })
    }

    /// Build a signer with 32 random bytes of key material.
    ///
    /// # Errors
    /// Returns [`InvalidLength`] if the MAC rejects the key.
    pub fn random(ttl: Duration) -> Result<Self, InvalidLength> {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::new(&secret, ttl)
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration { self.ttl }

    /// Issue a token for `user_id` valid from `now` for the configured TTL.
    #[must_use]
    pub fn issue(&self, user_id: i32, now: DateTime<Utc>) -> String {
        let expires_at = (now + self.ttl).timestamp();
        let payload = format!("{user_id}.{expires_at}");
        let signature = hex::encode(self.sign(&payload));
        format!("{payload}.{signature}")
    }

    /// Verify signature and expiry of `token` at instant `now`.
    ///
    /// # Errors
    /// Returns a [`TokenError`] describing why the token was rejected.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (user, expiry) = payload.split_once('.').ok_or(TokenError::Malformed)?;
        let user_id = user.parse::<i32>().map_err(|_| TokenError::Malformed)?;
        let expires_at = expiry.parse::<i64>().map_err(|_| TokenError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        if expires_at <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(Claims {
            user_id,
            expires_at,
        })
    }

    fn sign(&self, payload: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

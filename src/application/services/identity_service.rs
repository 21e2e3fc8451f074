//! Identity Service
//!
//! Verifies bearer tokens presented on a live connection and resolves them to
//! the user identity the connection is bound to.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;
use crate::domain::{Identity, UserRepository};

/// Token validation contract used by the session handler.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityValidator: Send + Sync {
    /// Validate an opaque credential and return the identity it belongs to.
    async fn validate(&self, token: &str) -> Result<Identity, AuthError>;
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// HS256 JWT validator backed by the user store.
pub struct JwtIdentityValidator<U>
where
    U: UserRepository + ?Sized,
{
    user_repo: Arc<U>,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl<U> JwtIdentityValidator<U>
where
    U: UserRepository + ?Sized,
{
    /// Create a validator for tokens signed with the configured secret
    ///
    /// Expiry is enforced to the second: no clock-skew leeway.
    pub fn new(user_repo: Arc<U>, settings: &JwtSettings) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;

        Self {
            user_repo,
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
        }
    }

    fn decode_user_id(&self, token: &str) -> Result<i64, AuthError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken,
                }
            })?;

        token_data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[async_trait]
impl<U> IdentityValidator for JwtIdentityValidator<U>
where
    U: UserRepository + ?Sized,
{
    async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        let user_id = self.decode_user_id(token)?;

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;

        Ok(Identity::from(user))
    }
}

//! Bearer-token authentication for the `/api` routes.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, AppResult};

pub mod firebase;

pub use firebase::FirebaseAuth;

/// Identity provider that issues the tokens clients present
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verifies an ID token and returns the user id it was issued for
    async fn verify_id_token(&self, token: &str) -> AppResult<String>;

    /// Removes the user's identity
    async fn delete_user(&self, uid: &str) -> AppResult<()>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Pulls the token out of an `Authorization: Bearer <token>` value
pub fn bearer_token(header: Option<&str>) -> AppResult<&str> {
    let header =
        header.ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    // Exactly `Bearer` and a token, separated by a single space
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        )),
    }
}

/// The verified user id of the caller
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<dyn IdentityVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| value.to_str().unwrap_or_default());
        let token = bearer_token(header)?;

        let verifier = Arc::<dyn IdentityVerifier>::from_ref(state);
        match verifier.verify_id_token(token).await {
            Ok(uid) => {
                tracing::debug!(uid = %uid, provider = verifier.name(), "Caller authenticated");
                Ok(AuthUser(uid))
            }
            Err(e) => {
                tracing::warn!(error = %e, provider = verifier.name(), "Token verification failed");
                Err(AppError::Unauthorized(
                    "Invalid Firebase ID token".to_string(),
                ))
            }
        }
    }
}

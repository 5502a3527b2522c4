//! # Authentication
//!
//! Bearer-token authentication for the product endpoints. The middleware
//! decodes an HS256 token and, when it is valid, attaches the caller's
//! [`Principal`] to the request. Invalid or missing tokens leave the request
//! unauthenticated; handlers that need a principal reject with 401 through the
//! [`Principal`] extractor.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, unauthorized};

/// Authenticated identity and organization context of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub organization_id: Uuid,
}

/// Claims carried by catalog bearer tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    /// Organization id
    pub org: Uuid,
    /// Expiry as seconds since the epoch
    pub exp: usize,
}

/// Errors raised while minting or verifying tokens
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("no jwt secret configured")]
    MissingSecret,
    #[error("token rejected: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Mints a bearer token for `user_id` in `organization_id` valid for `ttl_seconds`.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    organization_id: Uuid,
    ttl_seconds: u64,
) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let exp = Utc::now().timestamp().max(0) as u64 + ttl_seconds;
    let claims = Claims {
        sub: user_id,
        org: organization_id,
        exp: exp as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Verifies a bearer token and returns the principal it identifies.
pub fn verify_token(secret: &str, token: &str) -> Result<Principal, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    Ok(Principal {
        user_id: data.claims.sub,
        organization_id: data.claims.org,
    })
}

/// Attaches a [`Principal`] to requests that carry a valid bearer token.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_bearer_token(request.headers()) {
        let secret = config.jwt_secret.as_deref().unwrap_or_default();
        match verify_token(secret, token) {
            Ok(principal) => {
                tracing::debug!(
                    user_id = %principal.user_id,
                    organization_id = %principal.organization_id,
                    "Authenticated request"
                );
                request.extensions_mut().insert(principal);
            }
            Err(err) => {
                tracing::info!(error = %err, "Ignoring invalid bearer token");
            }
        }
    }

    next.run(request).await
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .ok_or_else(|| unauthorized(Some("Authentication required")))
    }
}

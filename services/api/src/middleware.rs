//! Authentication middleware for JWT token validation
//!
//! Tokens are issued by the authentication service; this service only
//! verifies them and turns the `sub` claim into the acting user id.

use axum::{
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use social::UserId;
use tracing::warn;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User roles
    #[serde(default)]
    pub roles: Vec<String>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
}

/// Extract the token from an `Authorization: Bearer ...` header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Validate a token and build the authenticated user from its claims
fn decode_user(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<AuthUser, ApiError> {
    let token_data = jsonwebtoken::decode::<Claims>(token, key, validation).map_err(|e| {
        warn!("Failed to validate token: {}", e);
        ApiError::Unauthorized
    })?;

    if token_data.claims.token_type != TokenType::Access {
        warn!("Rejected non-access token for user {}", token_data.claims.sub);
        return Err(ApiError::Unauthorized);
    }

    Ok(AuthUser {
        id: UserId(token_data.claims.sub),
    })
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = true;

    let user = decode_user(token, &state.jwt_key, &validation)?;

    // Insert the user into the request extensions
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

//! User JWT authentication middleware.
//!
//! Protected routes sit behind [`require_user_auth`], which validates the
//! Bearer token and stores a [`UserAuth`] in request extensions for the
//! extractor to pick up.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use shared::jwt::{JwtConfig, JwtError};

/// Authenticated user information extracted from JWT.
#[derive(Debug, Clone)]
pub struct UserAuth {
    /// User ID from the JWT subject claim.
    pub user_id: Uuid,
    /// JWT ID (jti), logged for session tracing.
    pub jti: String,
}

impl UserAuth {
    /// Validates an access token and returns user authentication info.
    pub fn validate(jwt_config: &JwtConfig, token: &str) -> Result<Self, JwtError> {
        let claims = jwt_config.validate_access_token(token)?;

        Ok(UserAuth {
            user_id: claims.sub,
            jti: claims.jti,
        })
    }
}

/// Returns the token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Middleware that requires JWT user authentication.
pub async fn require_user_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(req.headers()) else {
        return ApiError::Unauthorized("Missing or invalid Authorization header".into())
            .into_response();
    };

    match UserAuth::validate(&state.jwt, token) {
        Ok(auth) => {
            tracing::debug!(user_id = %auth.user_id, jti = %auth.jti, "Authenticated request");
            req.extensions_mut().insert(auth);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!("JWT validation failed: {}", e);
            ApiError::Unauthorized("Invalid or expired token".into()).into_response()
        }
    }
}

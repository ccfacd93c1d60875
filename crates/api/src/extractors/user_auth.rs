//! Caller identity extractors.
//!
//! [`UserAuth`] requires a valid Bearer token; [`OptionalUserAuth`] lets
//! anonymous requests through and is used by the public event listing to
//! decide whether to report `is_registered`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
pub use crate::middleware::user_auth::UserAuth;
use crate::middleware::user_auth::bearer_token;

/// Identity stored by `require_user_auth`, or validated here on routes
/// outside that layer.
fn resolve(parts: &Parts, state: &AppState) -> Result<UserAuth, ApiError> {
    if let Some(auth) = parts.extensions.get::<UserAuth>() {
        return Ok(auth.clone());
    }

    let token = bearer_token(&parts.headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing or invalid Authorization header".into()))?;

    UserAuth::validate(&state.jwt, token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))
}

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
    }
}

/// The caller, if a valid token was sent. Bad tokens count as anonymous.
#[derive(Debug, Clone)]
pub struct OptionalUserAuth(pub Option<UserAuth>);

impl OptionalUserAuth {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|auth| auth.user_id)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalUserAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalUserAuth(resolve(parts, state).ok()))
    }
}

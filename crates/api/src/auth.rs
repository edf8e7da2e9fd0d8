//! Bearer-token authentication against the directory

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use unionpay_core::Caller;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller of a request
#[derive(Debug, Clone)]
pub struct AuthUser(pub Caller);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthenticated("Access token required"))?;

        match state.directory.resolve_caller(token).await {
            Ok(Some(caller)) => Ok(AuthUser(caller)),
            Ok(None) => Err(ApiError::unauthenticated("Invalid or expired token")),
            Err(e) => Err(ApiError::Issuance(e.into())),
        }
    }
}

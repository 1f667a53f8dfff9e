//! Caller extraction

use axum::{extract::FromRequestParts, http::request::Parts};

use super::AppState;
use super::error::ApiError;
use crate::service::Caller;

/// Header carrying the name of the calling user
pub const USER_HEADER: &str = "x-strata-user";

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::Unauthenticated)?;

        Ok(state.permissions.identify(name))
    }
}

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use studylog_core::{EngineError, UserId};

use crate::api::error::ApiError;

pub const IDENTITY_HEADER: &str = "x-user-id";

/// Caller identity placed on the request by the authentication layer in
/// front of this service. The header is trusted by precondition; a missing
/// or malformed value is surfaced as an unauthenticated failure.
#[derive(Clone, Copy, Debug)]
pub struct Identity(pub UserId);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::from(EngineError::Unauthenticated))?;
        let user_id: UserId = value
            .parse()
            .map_err(|_| ApiError::from(EngineError::Unauthenticated))?;
        Ok(Identity(user_id))
    }
}

//! Caller identity supplied by the upstream authentication layer.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;

use crate::error::ApiError;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller. Rejects the request with 401 when the header
/// is missing or not a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity(pub UserId);

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {USER_ID_HEADER} header")))?;

        value
            .to_str()
            .ok()
            .and_then(|raw| UserId::parse(raw.trim()).ok())
            .map(CallerIdentity)
            .ok_or_else(|| ApiError::Unauthorized(format!("Invalid {USER_ID_HEADER} header")))
    }
}

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header set by the authenticating gateway
pub const USER_ID_HEADER: &str = "x-user-id";

/// Id of the signed-in user; requests without one are rejected with 401
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| UserId(id.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}

//! Current user extraction

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Header carrying the authenticated user's id, set by the fronting proxy
pub const USER_HEADER: &str = "x-user-id";

/// The request's user, `None` when the request is anonymous
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub Option<String>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_HEADER) else {
            return Ok(CurrentUser(None));
        };
        let user = value
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid user header"))?
            .trim();

        if user.is_empty() {
            Ok(CurrentUser(None))
        } else {
            Ok(CurrentUser(Some(user.to_string())))
        }
    }
}

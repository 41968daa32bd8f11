use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use super::{cookies::ACCESS_COOKIE, jwt::JwtKeys};
use crate::{error::ApiError, state::AppState, users::repo_types::User};

/// The authenticated caller, loaded from the store.
///
/// The access token is read from the `accessToken` cookie, falling back to an
/// `Authorization: Bearer` header.
pub struct AuthUser(pub User);

fn access_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    jar.get(ACCESS_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|t| !t.is_empty())
        .or_else(|| {
            let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
            header
                .strip_prefix("Bearer ")
                .or_else(|| header.strip_prefix("bearer "))
                .map(|t| t.trim().to_owned())
                .filter(|t| !t.is_empty())
        })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = access_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized request".into()))?;

        let claims = JwtKeys::from_ref(state).verify_access(&token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            ApiError::Unauthorized("Invalid access token".into())
        })?;

        let user = state.users.find_by_id(claims.sub).await?.ok_or_else(|| {
            warn!(user_id = %claims.sub, "token for unknown user");
            ApiError::Unauthorized("Invalid access token".into())
        })?;

        Ok(AuthUser(user))
    }
}

//! Bearer-token authentication

use super::state::AppState;
use crate::error::ApiError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use cmp_types::Tenant;

/// The tenant that owns the request's bearer token.
///
/// Handlers taking this extractor reject the request with 401 before running
/// when the `Authorization` header is missing or the token is unknown.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Tenant);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".into()))?;

        let token = bearer_token(header)
            .ok_or_else(|| ApiError::Unauthorized("expected a Bearer token".into()))?;

        let tenant = state.orchestrator.authenticate(token).await?;
        Ok(Authenticated(tenant))
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}

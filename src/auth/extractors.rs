use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::{claims::Claims, jwt::JwtKeys};
use crate::error::ApiError;

/// Pulls the credential out of `Authorization: <scheme> <token>`. The scheme
/// word is not checked; the token is the second whitespace-separated part.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split_whitespace().nth(1))
        .ok_or(ApiError::MissingToken)
}

/// Extract, then verify signature, then check expiry.
pub fn authorize(headers: &HeaderMap, keys: &JwtKeys) -> Result<Claims, ApiError> {
    let token = bearer_token(headers).map_err(|e| {
        warn!("request without bearer token");
        e
    })?;
    keys.verify(token).map_err(|e| {
        warn!(reason = %e, "token rejected");
        ApiError::from(e)
    })
}

/// Verified claims of the caller; handlers taking this are never reached
/// with a missing, invalid, or expired token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(AuthUser(claims.clone()));
        }
        let keys = JwtKeys::from_ref(state);
        authorize(&parts.headers, &keys).map(AuthUser)
    }
}

/// Route-layer form of the same check: short-circuits with 401 or stores the
/// claims in request extensions for the wrapped handler.
pub async fn require_token(
    State(keys): State<JwtKeys>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = authorize(req.headers(), &keys)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

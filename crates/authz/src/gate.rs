//! Request gate: bearer token in, verified [`Identity`] out.
//!
//! Every rejection becomes a 401. The precise reason is logged and kept on
//! [`GateError`] for tests but never sent to the client beyond the message.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use shelf_http::AppError;

use crate::token::{Identity, TokenKeys, VerificationError};

const BEARER: &str = "Bearer ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("authorization header missing or not bearer")]
    MissingToken,
    #[error("bearer token segment is empty")]
    MalformedToken,
    #[error("token rejected: {0}")]
    Rejected(VerificationError),
    #[error("token payload lacks identity fields")]
    InvalidPayload,
    #[error("no verified identity on request")]
    Unauthenticated,
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        tracing::warn!(reason = %err, "request gate rejected request");

        let message = match err {
            GateError::MissingToken => "No valid token provided, authorization denied",
            GateError::MalformedToken => "Malformed token, authorization denied",
            GateError::Rejected(_) => "Token is not valid",
            GateError::InvalidPayload => "Invalid token payload",
            GateError::Unauthenticated => "Authorization required",
        };
        AppError::unauthorized(message)
    }
}

/// Extract and verify the bearer token carried by `headers`.
///
/// Never touches storage.
pub fn authenticate(headers: &HeaderMap, keys: &TokenKeys) -> Result<Identity, GateError> {
    let rest = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER))
        .ok_or(GateError::MissingToken)?;

    let token = rest
        .split(' ')
        .next()
        .filter(|token| !token.is_empty())
        .ok_or(GateError::MalformedToken)?;

    match keys.verify(token) {
        Ok(claims) => Ok(claims.user),
        Err(VerificationError::InvalidPayload) => Err(GateError::InvalidPayload),
        Err(kind) => Err(GateError::Rejected(kind)),
    }
}

/// Middleware guarding protected routes.
///
/// On success the caller's [`Identity`] is placed in the request extensions.
pub async fn require_identity(
    State(keys): State<Arc<TokenKeys>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = authenticate(request.headers(), &keys)?;
    tracing::debug!(user_id = %identity.id, "request authenticated");

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| GateError::Unauthenticated.into())
    }
}

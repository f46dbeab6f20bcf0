use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{
    identity::Identity,
    policy::Decision,
    token::TokenCodec,
};
use crate::{AppState, error::AppError};

const BEARER: &str = "Bearer";

/// bearer_token
///
/// Extracts the token from an `Authorization: Bearer <token>` header. The scheme
/// is matched case-insensitively; any other scheme (Basic, ...) yields `None`.
/// A bare `Bearer` with nothing after it yields `Some("")`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
    scheme.eq_ignore_ascii_case(BEARER).then(|| token.trim())
}

/// authenticate
///
/// Resolves the caller identity for one request. This never fails: a missing
/// header and an invalid token both produce the anonymous identity, and it is
/// left to the policy to decide whether anonymous access is acceptable for
/// the route. A garbage token therefore never blocks a public endpoint.
pub fn authenticate(headers: &HeaderMap, codec: &TokenCodec) -> Identity {
    let Some(token) = bearer_token(headers) else {
        return Identity::anonymous();
    };

    match codec.verify(token) {
        Ok(identity) => identity,
        Err(reason) => {
            tracing::debug!(%reason, "bearer token rejected, continuing as anonymous");
            Identity::anonymous()
        }
    }
}

/// access_control
///
/// The middleware installed in front of every route (and the fallback).
///
/// *Flow*:
/// 1. Authenticate from the `Authorization` header (synchronously, no await).
/// 2. Evaluate the central `Policy` for the request path and method.
/// 3. On `Allow`, store the `Identity` in the request extensions so handlers
///    receive it explicitly through the `Identity` extractor.
/// 4. On `Deny`, answer 401 (route needs any identity, none given) or 403
///    (route needs a role the caller lacks, anonymous included) without ever
///    reaching a handler or the storage layer.
pub async fn access_control(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = authenticate(request.headers(), &state.codec);

    match state
        .policy
        .authorize(request.uri().path(), request.method(), &identity)
    {
        Decision::Allow => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Decision::Deny(reason) => {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                actor = identity.actor(),
                ?reason,
                "request denied by access policy"
            );
            AppError::from(reason).into_response()
        }
    }
}

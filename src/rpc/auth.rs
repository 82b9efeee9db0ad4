//! Bearer credential check for the wallet-service RPC.
//!
//! Sealed credentials compare the presented token by digest; the open
//! (legacy) credential admits every request.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::security::RpcCredential;

/// Reject requests whose `Authorization: Bearer <password>` does not match.
pub async fn require_credential(
    State(credential): State<Arc<RpcCredential>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if credential.verify(presented) {
        return Ok(next.run(request).await);
    }

    tracing::warn!(path = %request.uri().path(), "Rejected RPC request with bad credential");
    Err(StatusCode::UNAUTHORIZED)
}

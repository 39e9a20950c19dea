use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::AppError;

/// Extension type carrying the bearer token through to the handler, which
/// forwards it verbatim to the LLM bridge. This is pass-through, not
/// validation: the service has no API-key store of its own.
#[derive(Clone)]
pub struct BearerToken(pub String);

/// Requires `Authorization: Bearer <token>` on every route except the
/// liveness check, matching the teacher's auth-middleware skip-list
/// convention for `/health`.
pub async fn auth_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Result<Response, AppError> {
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let token = extract_bearer(&headers).ok_or(AppError::Unauthorized)?;
    request.extensions_mut().insert(BearerToken(token));
    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("Authorization")?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Extension type carrying the derived request id through to the handler,
/// where it doubles as the session id fallback when the caller omits one.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Reuses the caller's `X-NCP-CLOVASTUDIO-REQUEST-ID` header if present
/// (matching the header the LLM bridge itself sends upstream), otherwise
/// mints a UUID v4.
pub async fn request_id_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    let id = headers
        .get("x-ncp-clovastudio-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(val) = HeaderValue::from_str(&id) {
        response.headers_mut().insert("x-request-id", val);
    }
    response
}

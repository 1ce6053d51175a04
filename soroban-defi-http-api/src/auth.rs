use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use crate::DefiApiState;

pub async fn auth_middleware(
    State(state): State<Arc<DefiApiState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get("authorization")
        .or_else(|| request.headers().get("x-api-token"))
        .and_then(|v| v.to_str().ok());

    let token = match auth_header {
        Some(header) => header.strip_prefix("Bearer ").unwrap_or(header),
        None => return Err(StatusCode::UNAUTHORIZED),
    };

    if token == expected {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

//! Axum HTTP handlers for the web server
//!
//! Provides the Model Context Protocol endpoint and the liveness check.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::errors::AppError;
use crate::mcp::session::SESSION_HEADER;
use crate::AppState;

pub const HEALTH_BODY: &str = "OK";

pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, HEALTH_BODY)
}

pub async fn mcp_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let presented = headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok());

    let exchange = state
        .sessions
        .handle_exchange(&state, presented, &body)
        .await?;

    let mut response = match exchange.reply {
        Some(reply) => (StatusCode::OK, Json(reply)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };

    let session_id = HeaderValue::from_str(&exchange.session.id)
        .map_err(|err| AppError::transport(format!("session id is not a header value: {err}")))?;
    response.headers_mut().insert(SESSION_HEADER, session_id);

    Ok(response)
}

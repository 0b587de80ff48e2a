use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::domain::tools::ToolName;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest {
        code: &'static str,
        message: &'static str,
    },
    #[error("internal error: {message}")]
    Internal { code: &'static str, message: String },
    #[error("transport fault: {message}")]
    Transport { message: String },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: &'static str) -> Self {
        Self::BadRequest { code, message }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "internal_error",
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest { code, message } => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    code: code.to_string(),
                    message: message.to_string(),
                    details: json!({}),
                }),
            )
                .into_response(),
            Self::Internal { message, .. } | Self::Transport { message } => {
                tracing::error!(error = %message, "request failed with transport fault");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Failure raised while resolving or running a tool. Its `Display` text is
/// what callers read inside an `isError` envelope.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: ToolName, reason: String },
    #[error("{0}")]
    Execution(String),
    #[error("browser backend returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl ToolError {
    pub fn invalid_arguments(tool: ToolName, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool,
            reason: reason.into(),
        }
    }
}

/// Startup consistency failures between the tool registry and the routing table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no handler bound for tool {0}")]
    MissingHandler(ToolName),
    #[error("more than one handler bound for tool {0}")]
    DuplicateHandler(ToolName),
    #[error("no descriptor registered for tool {0}")]
    MissingDescriptor(ToolName),
    #[error("descriptor {0} does not name a routable tool")]
    UnroutableDescriptor(String),
}

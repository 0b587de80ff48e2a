//! Uniform tool response envelope
//!
//! Every `tools/call` outcome leaves the server as a `CallToolResult`:
//! handler results pass through untouched, failures become a single text
//! block flagged with `isError`.

use rust_mcp_sdk::schema::{CallToolResult, ContentBlock, TextContent};

use crate::errors::ToolError;

pub const FAILURE_PREFIX: &str = "❌ Tool execution failed: ";

pub fn normalize_outcome(outcome: Result<CallToolResult, ToolError>) -> CallToolResult {
    match outcome {
        Ok(result) => result,
        Err(err) => failure_envelope(&err),
    }
}

pub fn failure_envelope(err: &ToolError) -> CallToolResult {
    CallToolResult {
        content: vec![text_block(format!("{FAILURE_PREFIX}{err}"))],
        is_error: Some(true),
        meta: None,
        structured_content: None,
    }
}

/// Successful single-text result, for handlers that only report a message.
pub fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult {
        content: vec![text_block(text.into())],
        is_error: None,
        meta: None,
        structured_content: None,
    }
}

fn text_block(text: String) -> ContentBlock {
    ContentBlock::from(TextContent::new(text, None, None))
}

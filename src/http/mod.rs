//! HTTP Transport layer for the Model Context Protocol
//!
//! Provides the `/mcp` exchange endpoint and the `/health` check.

pub mod handlers;

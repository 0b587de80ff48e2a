//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Provides protocol-level specifics surrounding JSON-RPC validation, the
//! handshake, method routing, and session binding of HTTP exchanges.

pub mod rpc;
pub mod server;
pub mod session;

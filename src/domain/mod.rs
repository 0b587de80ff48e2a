//! Tool catalog, argument shapes, routing and the response envelope
//!
//! Everything between a decoded `tools/call` and the envelope that leaves
//! the dispatcher lives here.

pub mod arguments;
pub mod envelope;
pub mod routing;
pub mod tools;

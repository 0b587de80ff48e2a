//! Tool routing table and the `tools/call` dispatcher
//!
//! The table binds each `ToolName` to exactly one handler and is checked
//! against the registry before the server starts. At request time the
//! dispatcher only resolves the name, hands the raw arguments over, and
//! folds whatever comes back into the response envelope.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use rust_mcp_sdk::schema::{CallToolRequestParams, CallToolResult};
use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::envelope::normalize_outcome;
use crate::domain::tools::{ToolName, ToolRegistry};
use crate::errors::{RegistryError, ToolError};
use crate::lifecycle::contain_panics;
use crate::mcp::rpc::{json_rpc_error, json_rpc_result};
use crate::AppState;

/// A single tool implementation. Handlers own their argument validation:
/// the dispatcher passes the payload through as an opaque mapping.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(
        &self,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult, ToolError>;
}

pub struct RoutingTable {
    handlers: HashMap<ToolName, Arc<dyn ToolHandler>>,
}

impl RoutingTable {
    pub fn builder() -> RoutingTableBuilder {
        RoutingTableBuilder::default()
    }

    pub fn handler(&self, tool: ToolName) -> Option<&Arc<dyn ToolHandler>> {
        self.handlers.get(&tool)
    }

    /// Checks that registry descriptors and bound handlers describe the same
    /// set of tools.
    pub fn ensure_consistent_with(&self, registry: &ToolRegistry) -> Result<(), RegistryError> {
        for descriptor in registry.tools() {
            let tool = descriptor
                .name
                .parse::<ToolName>()
                .map_err(|_| RegistryError::UnroutableDescriptor(descriptor.name.clone()))?;
            if !self.handlers.contains_key(&tool) {
                return Err(RegistryError::MissingHandler(tool));
            }
        }

        for tool in ToolName::ALL {
            if registry.descriptor(tool).is_none() {
                return Err(RegistryError::MissingDescriptor(tool));
            }
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct RoutingTableBuilder {
    bindings: Vec<(ToolName, Arc<dyn ToolHandler>)>,
}

impl RoutingTableBuilder {
    pub fn bind(mut self, tool: ToolName, handler: Arc<dyn ToolHandler>) -> Self {
        self.bindings.push((tool, handler));
        self
    }

    pub fn build(self) -> Result<RoutingTable, RegistryError> {
        let mut handlers = HashMap::with_capacity(self.bindings.len());
        for (tool, handler) in self.bindings {
            if handlers.insert(tool, handler).is_some() {
                return Err(RegistryError::DuplicateHandler(tool));
            }
        }

        if let Some(tool) = ToolName::ALL
            .into_iter()
            .find(|tool| !handlers.contains_key(tool))
        {
            return Err(RegistryError::MissingHandler(tool));
        }

        Ok(RoutingTable { handlers })
    }
}

pub async fn handle_tools_call(
    state: &AppState,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, -32602, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
    };

    let result = invoke_tool(&state.routes, &tool_call.name, tool_call.arguments).await;
    match serde_json::to_value(result) {
        Ok(result) => json_rpc_result(id, result),
        Err(err) => {
            warn!(tool = %tool_call.name, error = %err, "tool result could not be serialized");
            json_rpc_error(id, -32603, "Internal error")
        }
    }
}

/// Routes one invocation and always yields an envelope.
pub async fn invoke_tool(
    routes: &RoutingTable,
    name: &str,
    arguments: Option<Map<String, Value>>,
) -> CallToolResult {
    let outcome = dispatch(routes, name, arguments).await;
    if let Err(err) = &outcome {
        warn!(tool = %name, error = %err, "tool execution failed");
    }
    normalize_outcome(outcome)
}

async fn dispatch(
    routes: &RoutingTable,
    name: &str,
    arguments: Option<Map<String, Value>>,
) -> Result<CallToolResult, ToolError> {
    let tool = name.parse::<ToolName>()?;
    let handler = routes
        .handler(tool)
        .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

    let arguments = if tool.defaults_missing_arguments() {
        Some(arguments.unwrap_or_default())
    } else {
        arguments
    };

    contain_panics(handler.call(arguments))
        .await
        .map_err(ToolError::Panicked)?
}

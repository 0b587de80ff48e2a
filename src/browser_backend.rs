//! HTTP client for the external browser worker
//!
//! Browser control itself runs out of process. This backend validates tool
//! arguments locally, forwards them to the worker and hands the worker's
//! `CallToolResult` back to the dispatcher. It also acts as the browser
//! manager the lifecycle guard cleans up through.

use std::{io, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use rust_mcp_sdk::schema::CallToolResult;
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::arguments::validate_arguments;
use crate::domain::envelope::text_result;
use crate::domain::routing::{RoutingTable, ToolHandler};
use crate::domain::tools::ToolName;
use crate::errors::{AppError, RegistryError, ToolError};
use crate::lifecycle::BrowserManager;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(unix)]
const CHROME_PROCESS_PATTERNS: [&str; 2] = ["chrome", "chromium"];
#[cfg(windows)]
const CHROME_PROCESS_IMAGES: [&str; 2] = ["chrome.exe", "chromium.exe"];

pub struct HttpBrowserBackend {
    client: Client,
    base_url: String,
}

impl HttpBrowserBackend {
    pub fn new(base_url: &Url) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "falling back to default browser backend client");
                Client::new()
            });

        Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    /// Binds every tool to this backend.
    pub fn routing_table(self: &Arc<Self>) -> Result<RoutingTable, RegistryError> {
        ToolName::ALL
            .into_iter()
            .fold(RoutingTable::builder(), |builder, tool| {
                builder.bind(
                    tool,
                    Arc::new(BackendTool {
                        backend: Arc::clone(self),
                        tool,
                    }),
                )
            })
            .build()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn invoke(&self, tool: ToolName, payload: Value) -> Result<CallToolResult, ToolError> {
        let url = self.endpoint(&format!("tools/{tool}"));
        debug!(tool = %tool, url = %url, "forwarding tool call to browser worker");

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| ToolError::Execution(format!("browser backend unreachable: {err}")))?;

        let status = response.status();
        let raw_body = response.text().await.map_err(|err| {
            ToolError::Execution(format!("could not read browser backend response: {err}"))
        })?;

        if !status.is_success() {
            return Err(ToolError::Backend {
                status: status.as_u16(),
                message: raw_body.trim().to_string(),
            });
        }

        let mut result: CallToolResult = serde_json::from_str(&raw_body).map_err(|err| {
            ToolError::Execution(format!("browser backend sent an unreadable result: {err}"))
        })?;

        if result.content.is_empty() {
            result.content = text_result(format!("{tool} completed")).content;
        }

        Ok(result)
    }
}

struct BackendTool {
    backend: Arc<HttpBrowserBackend>,
    tool: ToolName,
}

#[async_trait]
impl ToolHandler for BackendTool {
    async fn call(
        &self,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult, ToolError> {
        let payload = validate_arguments(self.tool, arguments)?;
        self.backend.invoke(self.tool, payload).await
    }
}

#[async_trait]
impl BrowserManager for HttpBrowserBackend {
    async fn close_browser(&self) -> Result<(), AppError> {
        let response = match self
            .client
            .post(self.endpoint("browser/close"))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_connect() => {
                info!("browser worker not reachable, nothing to close");
                return Ok(());
            }
            Err(err) => return Err(AppError::internal(format!("browser close failed: {err}"))),
        };

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                info!("browser worker reports no open browser");
                Ok(())
            }
            status => Err(AppError::internal(format!(
                "browser close returned {status}"
            ))),
        }
    }

    async fn force_kill_all_chrome_processes(&self) -> Result<(), AppError> {
        kill_chrome_processes().await
    }
}

#[cfg(unix)]
async fn kill_chrome_processes() -> Result<(), AppError> {
    for pattern in CHROME_PROCESS_PATTERNS {
        let status = Command::new("pkill")
            .args(["-f", pattern])
            .status()
            .await
            .map_err(|err| spawn_failure("pkill", &err))?;

        // pkill exits with 1 when nothing matched.
        match status.code() {
            Some(0) => info!(pattern, "terminated browser processes"),
            Some(1) => debug!(pattern, "no browser processes matched"),
            _ => {
                return Err(AppError::internal(format!(
                    "pkill -f {pattern} failed with {status}"
                )))
            }
        }
    }
    Ok(())
}

#[cfg(windows)]
async fn kill_chrome_processes() -> Result<(), AppError> {
    for image in CHROME_PROCESS_IMAGES {
        let status = Command::new("taskkill")
            .args(["/F", "/T", "/IM", image])
            .status()
            .await
            .map_err(|err| spawn_failure("taskkill", &err))?;

        // taskkill exits with 128 when no process has that image name.
        match status.code() {
            Some(0) => info!(image, "terminated browser processes"),
            Some(128) => debug!(image, "no browser processes matched"),
            _ => {
                return Err(AppError::internal(format!(
                    "taskkill {image} failed with {status}"
                )))
            }
        }
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
async fn kill_chrome_processes() -> Result<(), AppError> {
    Ok(())
}

fn spawn_failure(program: &str, err: &io::Error) -> AppError {
    AppError::internal(format!("could not run {program}: {err}"))
}

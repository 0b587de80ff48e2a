//! Typed argument shapes for the browser tools
//!
//! Each struct is both the advertised `tools/list` descriptor and the decoder
//! handlers run over the opaque argument mapping, so the two cannot drift.
//! Anything the worker could not act on is rejected before a request leaves
//! the process.

use reqwest::Url;
use rust_mcp_sdk::macros;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::tools::ToolName;
use crate::errors::ToolError;

trait ToolArgs: DeserializeOwned + Serialize {
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

#[macros::mcp_tool(
    name = "browser_init",
    description = "Initialize a new browser instance with anti-detection features"
)]
#[derive(Debug, Default, Deserialize, Serialize, macros::JsonSchema)]
pub struct BrowserInitTool {
    /// Run the browser without a visible window (default: false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,
    /// Proxy server URL, e.g. http://host:port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Do not start a virtual display on Linux
    #[serde(rename = "disableXvfb")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_xvfb: Option<bool>,
    /// Launch without the default stealth flags
    #[serde(rename = "ignoreAllFlags")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_all_flags: Option<bool>,
}

impl ToolArgs for BrowserInitTool {
    fn check(&self) -> Result<(), String> {
        match self.proxy.as_deref() {
            Some(proxy) if Url::parse(proxy).is_err() => {
                Err(format!("proxy is not a valid URL: {proxy}"))
            }
            _ => Ok(()),
        }
    }
}

#[macros::mcp_tool(name = "browser_close", description = "Close the browser instance")]
#[derive(Debug, Default, Deserialize, Serialize, macros::JsonSchema)]
pub struct BrowserCloseTool {}

impl ToolArgs for BrowserCloseTool {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, macros::JsonSchema)]
pub enum WaitUntil {
    #[serde(rename = "load")]
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle0")]
    NetworkIdle0,
    #[serde(rename = "networkidle2")]
    NetworkIdle2,
}

#[macros::mcp_tool(name = "navigate", description = "Navigate to a URL")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct NavigateTool {
    /// The absolute http(s) URL to navigate to
    pub url: String,
    /// When to consider the navigation finished (default: load)
    #[serde(rename = "waitUntil")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_until: Option<WaitUntil>,
}

impl ToolArgs for NavigateTool {
    fn check(&self) -> Result<(), String> {
        let url = Url::parse(&self.url).map_err(|_| format!("Invalid URL: {}", self.url))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(format!("Unsupported URL scheme: {scheme}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, macros::JsonSchema)]
pub enum ContentKind {
    #[serde(rename = "html")]
    Html,
    #[serde(rename = "text")]
    Text,
}

#[macros::mcp_tool(
    name = "get_content",
    description = "Get the content of the current page or of one element"
)]
#[derive(Debug, Default, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetContentTool {
    /// Content representation (default: html)
    #[serde(rename = "type")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContentKind>,
    /// CSS selector limiting the content to one element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

impl ToolArgs for GetContentTool {
    fn check(&self) -> Result<(), String> {
        optional_non_empty("selector", self.selector.as_deref())
    }
}

#[macros::mcp_tool(name = "click", description = "Click on an element")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct ClickTool {
    /// CSS selector of the element to click
    pub selector: String,
    /// Wait for a navigation triggered by the click
    #[serde(rename = "waitForNavigation")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_navigation: Option<bool>,
}

impl ToolArgs for ClickTool {
    fn check(&self) -> Result<(), String> {
        non_empty("selector", &self.selector)
    }
}

#[macros::mcp_tool(name = "type", description = "Type text into an input field")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct TypeTool {
    /// CSS selector of the input field
    pub selector: String,
    /// Text to type
    pub text: String,
    /// Delay between key presses in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
}

impl ToolArgs for TypeTool {
    fn check(&self) -> Result<(), String> {
        non_empty("selector", &self.selector)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, macros::JsonSchema)]
pub enum WaitKind {
    #[serde(rename = "selector")]
    Selector,
    #[serde(rename = "navigation")]
    Navigation,
    #[serde(rename = "timeout")]
    Timeout,
}

#[macros::mcp_tool(
    name = "wait",
    description = "Wait for a selector, a navigation, or a fixed time"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct WaitTool {
    /// What to wait for
    #[serde(rename = "type")]
    pub kind: WaitKind,
    /// Selector to wait for, or milliseconds when type is timeout
    pub value: String,
    /// Maximum wait in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl ToolArgs for WaitTool {
    fn check(&self) -> Result<(), String> {
        match self.kind {
            WaitKind::Timeout => self
                .value
                .trim()
                .parse::<u64>()
                .map(|_| ())
                .map_err(|_| format!("timeout value must be milliseconds, got {}", self.value)),
            WaitKind::Selector | WaitKind::Navigation => non_empty("value", &self.value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, macros::JsonSchema)]
pub enum CaptchaKind {
    #[serde(rename = "recaptcha")]
    Recaptcha,
    #[serde(rename = "hCaptcha")]
    HCaptcha,
    #[serde(rename = "turnstile")]
    Turnstile,
}

#[macros::mcp_tool(
    name = "solve_captcha",
    description = "Solve a captcha on the current page"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct SolveCaptchaTool {
    /// Captcha provider
    #[serde(rename = "type")]
    pub kind: CaptchaKind,
}

impl ToolArgs for SolveCaptchaTool {}

#[macros::mcp_tool(
    name = "random_scroll",
    description = "Scroll the page randomly to mimic a human reader"
)]
#[derive(Debug, Default, Deserialize, Serialize, macros::JsonSchema)]
pub struct RandomScrollTool {}

impl ToolArgs for RandomScrollTool {}

#[macros::mcp_tool(
    name = "find_selector",
    description = "Find a CSS selector for an element by its visible text"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct FindSelectorTool {
    /// Visible text of the element
    pub text: String,
    /// Restrict the search to one tag, e.g. button
    #[serde(rename = "elementType")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    /// Require an exact text match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<bool>,
}

impl ToolArgs for FindSelectorTool {
    fn check(&self) -> Result<(), String> {
        non_empty("text", &self.text)?;
        optional_non_empty("elementType", self.element_type.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, macros::JsonSchema)]
pub enum ContentSource {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "html")]
    Html,
    #[serde(rename = "markdown")]
    Markdown,
}

#[macros::mcp_tool(
    name = "save_content_as_markdown",
    description = "Save the current page content to a markdown file"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct SaveContentAsMarkdownTool {
    /// Destination file path
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// Source representation (default: markdown)
    #[serde(rename = "contentType")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentSource>,
    /// CSS selector limiting the saved content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

impl ToolArgs for SaveContentAsMarkdownTool {
    fn check(&self) -> Result<(), String> {
        non_empty("filePath", &self.file_path)?;
        optional_non_empty("selector", self.selector.as_deref())
    }
}

fn non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} must not be empty"))
    } else {
        Ok(())
    }
}

fn optional_non_empty(field: &str, value: Option<&str>) -> Result<(), String> {
    value.map_or(Ok(()), |value| non_empty(field, value))
}

fn decode<T: ToolArgs>(
    tool: ToolName,
    arguments: Option<Map<String, Value>>,
) -> Result<Value, ToolError> {
    let raw = Value::Object(arguments.unwrap_or_default());
    let args: T = serde_json::from_value(raw)
        .map_err(|err| ToolError::invalid_arguments(tool, err.to_string()))?;
    args.check()
        .map_err(|reason| ToolError::invalid_arguments(tool, reason))?;
    serde_json::to_value(&args).map_err(|err| ToolError::Execution(err.to_string()))
}

/// Decodes and checks the arguments of `tool`, returning the normalized
/// payload to forward to the browser worker.
pub fn validate_arguments(
    tool: ToolName,
    arguments: Option<Map<String, Value>>,
) -> Result<Value, ToolError> {
    match tool {
        ToolName::BrowserInit => decode::<BrowserInitTool>(tool, arguments),
        ToolName::BrowserClose => decode::<BrowserCloseTool>(tool, arguments),
        ToolName::Navigate => decode::<NavigateTool>(tool, arguments),
        ToolName::GetContent => decode::<GetContentTool>(tool, arguments),
        ToolName::Click => decode::<ClickTool>(tool, arguments),
        ToolName::Type => decode::<TypeTool>(tool, arguments),
        ToolName::Wait => decode::<WaitTool>(tool, arguments),
        ToolName::SolveCaptcha => decode::<SolveCaptchaTool>(tool, arguments),
        ToolName::RandomScroll => decode::<RandomScrollTool>(tool, arguments),
        ToolName::FindSelector => decode::<FindSelectorTool>(tool, arguments),
        ToolName::SaveContentAsMarkdown => decode::<SaveContentAsMarkdownTool>(tool, arguments),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn args(value: Value) -> Option<Map<String, Value>> {
        value.as_object().cloned()
    }

    fn accepts(tool: ToolName, value: Value) -> bool {
        validate_arguments(tool, args(value)).is_ok()
    }

    fn rejection(tool: ToolName, value: Value) -> String {
        validate_arguments(tool, args(value))
            .expect_err("arguments must be rejected")
            .to_string()
    }

    #[test]
    fn advertised_required_fields_match_decoder() {
        for tool in ToolName::ALL {
            let descriptor = tool.descriptor();
            let outcome = validate_arguments(tool, Some(Map::new()));
            match descriptor.input_schema.required.first() {
                Some(field) => {
                    let error = outcome.expect_err("required field missing").to_string();
                    assert!(
                        error.contains(&format!("missing field `{field}`")),
                        "{tool}: {error}"
                    );
                }
                None => assert!(outcome.is_ok(), "{tool} should accept no arguments"),
            }
        }
    }

    #[test]
    fn advertised_properties_use_wire_names() {
        let properties = ToolName::SaveContentAsMarkdown
            .descriptor()
            .input_schema
            .properties
            .expect("save properties");
        assert!(properties.contains_key("filePath"));
        assert!(properties.contains_key("contentType"));
        assert!(!properties.contains_key("file_path"));
    }

    #[test]
    fn navigate_accepts_http_urls() {
        let payload = validate_arguments(
            ToolName::Navigate,
            args(json!({ "url": "https://example.com", "waitUntil": "networkidle2" })),
        )
        .expect("valid navigate arguments");
        assert_eq!(
            payload,
            json!({ "url": "https://example.com", "waitUntil": "networkidle2" })
        );
    }

    #[test]
    fn navigate_rejects_malformed_and_foreign_urls() {
        let malformed = rejection(ToolName::Navigate, json!({ "url": "not a url" }));
        assert_eq!(
            malformed,
            "invalid arguments for navigate: Invalid URL: not a url"
        );

        let foreign = rejection(ToolName::Navigate, json!({ "url": "file:///etc/passwd" }));
        assert!(foreign.contains("Unsupported URL scheme: file"));

        let missing = rejection(ToolName::Navigate, json!({}));
        assert!(missing.contains("missing field `url`"));
    }

    #[test]
    fn option_tools_accept_absent_arguments() {
        assert_eq!(
            validate_arguments(ToolName::BrowserInit, None).expect("defaults"),
            json!({})
        );
        assert_eq!(
            validate_arguments(ToolName::GetContent, None).expect("defaults"),
            json!({})
        );
        assert_eq!(
            validate_arguments(ToolName::RandomScroll, None).expect("no arguments"),
            json!({})
        );
    }

    #[test]
    fn browser_init_keeps_camel_case_keys() {
        let payload = validate_arguments(
            ToolName::BrowserInit,
            args(json!({ "headless": true, "disableXvfb": true })),
        )
        .expect("valid init arguments");
        assert_eq!(payload, json!({ "headless": true, "disableXvfb": true }));
    }

    #[test]
    fn browser_init_rejects_malformed_proxy() {
        let error = rejection(ToolName::BrowserInit, json!({ "proxy": "not a proxy" }));
        assert!(error.contains("proxy is not a valid URL"));
    }

    #[test]
    fn click_and_type_require_selectors() {
        let blank = rejection(ToolName::Click, json!({ "selector": " " }));
        assert!(blank.contains("selector must not be empty"));

        let missing = rejection(ToolName::Type, json!({ "selector": "#q" }));
        assert!(missing.contains("missing field `text`"));

        assert!(accepts(
            ToolName::Type,
            json!({ "selector": "#q", "text": "", "delay": 40 })
        ));
    }

    #[test]
    fn wait_timeout_requires_milliseconds() {
        assert!(accepts(
            ToolName::Wait,
            json!({ "type": "timeout", "value": "250" })
        ));

        let error = rejection(ToolName::Wait, json!({ "type": "timeout", "value": "soon" }));
        assert!(error.contains("timeout value must be milliseconds"));
    }

    #[test]
    fn wait_value_is_a_string() {
        assert!(accepts(
            ToolName::Wait,
            json!({ "type": "selector", "value": "#ready", "timeout": 1000 })
        ));

        let numeric = rejection(ToolName::Wait, json!({ "type": "timeout", "value": 500 }));
        assert!(numeric.contains("invalid type"));

        let unknown = rejection(ToolName::Wait, json!({ "type": "forever", "value": "x" }));
        assert!(unknown.contains("unknown variant"));
    }

    #[test]
    fn captcha_kind_is_case_sensitive() {
        assert!(accepts(ToolName::SolveCaptcha, json!({ "type": "hCaptcha" })));

        let error = rejection(ToolName::SolveCaptcha, json!({ "type": "hcaptcha" }));
        assert!(error.contains("unknown variant"));
    }

    #[test]
    fn save_content_requires_file_path() {
        let error = rejection(ToolName::SaveContentAsMarkdown, json!({ "filePath": "" }));
        assert!(error.contains("filePath must not be empty"));

        let payload = validate_arguments(
            ToolName::SaveContentAsMarkdown,
            args(json!({ "filePath": "/tmp/page.md", "contentType": "html" })),
        )
        .expect("valid save arguments");
        assert_eq!(payload["contentType"], "html");
    }

    #[test]
    fn find_selector_requires_text() {
        let error = rejection(ToolName::FindSelector, json!({ "exact": true }));
        assert!(error.contains("missing field `text`"));

        assert!(accepts(
            ToolName::FindSelector,
            json!({ "text": "Sign in", "elementType": "button" })
        ));
    }
}

//! Catalog of the browser automation tools exposed over MCP
//!
//! Holds the closed set of tool names and the static descriptors advertised
//! through `tools/list`. Nothing here executes a tool.

use std::{collections::HashMap, fmt, str::FromStr};

use rust_mcp_sdk::schema::Tool;

use crate::domain::arguments::{
    BrowserCloseTool, BrowserInitTool, ClickTool, FindSelectorTool, GetContentTool, NavigateTool,
    RandomScrollTool, SaveContentAsMarkdownTool, SolveCaptchaTool, TypeTool, WaitTool,
};
use crate::errors::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    BrowserInit,
    BrowserClose,
    Navigate,
    GetContent,
    Click,
    Type,
    Wait,
    SolveCaptcha,
    RandomScroll,
    FindSelector,
    SaveContentAsMarkdown,
}

impl ToolName {
    /// Every tool, in the order `tools/list` advertises them.
    pub const ALL: [ToolName; 11] = [
        ToolName::BrowserInit,
        ToolName::Navigate,
        ToolName::GetContent,
        ToolName::Click,
        ToolName::Type,
        ToolName::Wait,
        ToolName::BrowserClose,
        ToolName::SolveCaptcha,
        ToolName::RandomScroll,
        ToolName::FindSelector,
        ToolName::SaveContentAsMarkdown,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ToolName::BrowserInit => "browser_init",
            ToolName::BrowserClose => "browser_close",
            ToolName::Navigate => "navigate",
            ToolName::GetContent => "get_content",
            ToolName::Click => "click",
            ToolName::Type => "type",
            ToolName::Wait => "wait",
            ToolName::SolveCaptcha => "solve_captcha",
            ToolName::RandomScroll => "random_scroll",
            ToolName::FindSelector => "find_selector",
            ToolName::SaveContentAsMarkdown => "save_content_as_markdown",
        }
    }

    /// Tools whose handlers take a plain options object: an absent
    /// `arguments` payload reaches them as an empty mapping.
    pub const fn defaults_missing_arguments(self) -> bool {
        matches!(self, ToolName::BrowserInit | ToolName::GetContent)
    }

    pub fn descriptor(self) -> Tool {
        match self {
            ToolName::BrowserInit => BrowserInitTool::tool(),
            ToolName::BrowserClose => BrowserCloseTool::tool(),
            ToolName::Navigate => NavigateTool::tool(),
            ToolName::GetContent => GetContentTool::tool(),
            ToolName::Click => ClickTool::tool(),
            ToolName::Type => TypeTool::tool(),
            ToolName::Wait => WaitTool::tool(),
            ToolName::SolveCaptcha => SolveCaptchaTool::tool(),
            ToolName::RandomScroll => RandomScrollTool::tool(),
            ToolName::FindSelector => FindSelectorTool::tool(),
            ToolName::SaveContentAsMarkdown => SaveContentAsMarkdownTool::tool(),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|tool| tool.as_str() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }
}

/// Ordered tool descriptors plus a name index. Built once at startup.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<ToolName, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::from_tools(ToolName::ALL.iter().map(|tool| tool.descriptor()).collect())
    }

    pub(crate) fn from_tools(tools: Vec<Tool>) -> Self {
        let index = tools
            .iter()
            .enumerate()
            .filter_map(|(position, tool)| {
                tool.name
                    .parse::<ToolName>()
                    .ok()
                    .map(|name| (name, position))
            })
            .collect();
        Self { tools, index }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn descriptor(&self, name: ToolName) -> Option<&Tool> {
        self.index
            .get(&name)
            .and_then(|position| self.tools.get(*position))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().expect("known tool"), tool);
        }
    }

    #[test]
    fn all_lists_each_tool_once() {
        let unique: HashSet<ToolName> = ToolName::ALL.into_iter().collect();
        assert_eq!(unique.len(), ToolName::ALL.len());
    }

    #[test]
    fn unknown_name_is_tool_not_found() {
        let error = "unknown_tool".parse::<ToolName>().expect_err("unknown tool");
        assert!(matches!(error, ToolError::UnknownTool(ref name) if name == "unknown_tool"));
    }

    #[test]
    fn names_are_case_sensitive() {
        assert!("Navigate".parse::<ToolName>().is_err());
    }

    #[test]
    fn registry_indexes_every_tool() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.tools().len(), ToolName::ALL.len());
        for tool in ToolName::ALL {
            let descriptor = registry.descriptor(tool).expect("descriptor present");
            assert_eq!(descriptor.name, tool.as_str());
        }
    }

    #[test]
    fn registry_preserves_advertised_order() {
        let registry = ToolRegistry::new();
        let names: Vec<&str> = registry
            .tools()
            .iter()
            .map(|tool| tool.name.as_str())
            .collect();
        assert_eq!(names.first(), Some(&"browser_init"));
        assert_eq!(names.last(), Some(&"save_content_as_markdown"));
    }

    #[test]
    fn navigate_schema_requires_url() {
        let descriptor = ToolName::Navigate.descriptor();
        assert_eq!(descriptor.input_schema.required, vec!["url".to_string()]);
        let properties = descriptor
            .input_schema
            .properties
            .expect("navigate properties");
        assert_eq!(properties["url"]["type"], "string");
        assert!(properties.contains_key("waitUntil"));
    }

    #[test]
    fn only_simple_option_tools_default_missing_arguments() {
        let defaulted: Vec<ToolName> = ToolName::ALL
            .into_iter()
            .filter(|tool| tool.defaults_missing_arguments())
            .collect();
        assert_eq!(defaulted, vec![ToolName::BrowserInit, ToolName::GetContent]);
    }
}

//! Tool System Module
//!
//! The closed tool set the advisor agent can call: one tool per planet plus
//! the human-input escape hatch. Tools share a fixed invoke contract and a
//! per-turn context instead of reaching into global state.

mod human;
mod planet;

pub use human::HumanInputTool;
pub use planet::{builtin_planet_tools, PlanetTool};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::agent::provider::{LLMProvider, SamplingParams};
use crate::agent::AgentResult;
use crate::astrology::Chart;
use crate::transport::Transport;

/// Output from a tool execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolOutput {
    /// Whether the tool execution was successful
    pub success: bool,
    /// The output data (can be string, JSON object, etc.)
    pub data: Value,
    /// Human-readable summary of the output
    pub summary: String,
    /// Optional error message if success is false
    pub error: Option<String>,
}

impl ToolOutput {
    /// Create a successful output with string data
    pub fn success_str(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            success: true,
            summary: content.clone(),
            data: Value::String(content),
            error: None,
        }
    }

    /// Create a failed output
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            data: Value::Null,
            summary: format!("Error: {}", error),
            error: Some(error),
        }
    }
}

/// A tool call request parsed from LLM output
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct ToolCall {
    /// Name of the tool to call
    pub name: String,
    /// Parameters for the tool
    pub parameters: Value,
}

/// Per-turn collaborators handed to every tool invocation.
#[derive(Clone)]
pub struct ToolContext {
    /// The session's computed chart, once intake has produced one.
    pub chart: Option<Arc<Chart>>,
    pub transport: Arc<dyn Transport>,
    /// When set, planet advice is passed through one LLM completion.
    pub refiner: Option<Arc<dyn LLMProvider>>,
    pub model: String,
    pub sampling: SamplingParams,
}

/// Trait for tools the advisor can execute
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the unique name of the tool
    fn name(&self) -> String;

    /// Get a description of what the tool does
    fn description(&self) -> String;

    /// Execute the tool against a single query string
    async fn invoke(&self, input: &str, ctx: &ToolContext) -> AgentResult<ToolOutput>;
}

/// Registry for the available tools
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool instance
    pub async fn register_instance<T: Tool + 'static>(&self, tool: T) {
        let mut tools = self.tools.write().await;
        tools.insert(tool.name(), Arc::new(tool));
    }

    /// Look a tool up, tolerating case drift in model output.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().await;
        if let Some(tool) = tools.get(name) {
            return Some(tool.clone());
        }
        tools
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, tool)| tool.clone())
    }

    /// Registered tool names, sorted for stable prompts.
    pub async fn tool_names(&self) -> Vec<String> {
        let tools = self.tools.read().await;
        let mut names: Vec<String> = tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// One line per tool for the advisor prompt.
    pub async fn describe_for_prompt(&self) -> String {
        let tools = self.tools.read().await;
        let mut lines: Vec<String> = tools
            .values()
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect();
        lines.sort();
        lines.join("\n")
    }

    /// Execute a parsed tool call. Unknown tools become a failed output so
    /// the advisor loop can observe the mistake and correct itself.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> AgentResult<ToolOutput> {
        let tool = match self.get(&call.name).await {
            Some(tool) => tool,
            None => return Ok(ToolOutput::failure(format!("Unknown tool: {}", call.name))),
        };

        let input = match &call.parameters {
            Value::String(s) => s.clone(),
            value => value
                .get("input")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
        };

        tool.invoke(&input, ctx).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

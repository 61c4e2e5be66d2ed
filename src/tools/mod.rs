//! Tools module - capabilities the model can invoke
//!
//! Tools are registered once at startup in a [`ToolRegistry`] and resolved
//! by name when the model asks for them.

mod registry;
mod time;

pub use registry::{ToolDefinition, ToolRegistry};
pub use time::{format_utc, CurrentTimeTool};

use async_trait::async_trait;
use serde_json::Value;
use crate::Result;

/// Tool trait - interface for all agent tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in function calls
    fn name(&self) -> &str;

    /// Description of what the tool does
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters(&self) -> Value;

    /// Execute the tool with the arguments supplied by the model
    async fn execute(&self, arguments: Value) -> Result<Value>;

    /// Convert to tool definition for LLM
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Tool returning a fixed value, for tests
#[cfg(test)]
pub struct StaticTool {
    pub name: String,
    pub result: Value,
}

#[cfg(test)]
#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { "Static tool for testing" }
    fn parameters(&self) -> Value { serde_json::json!({"type": "object"}) }

    async fn execute(&self, _arguments: Value) -> Result<Value> {
        Ok(self.result.clone())
    }
}

/// Tool that always fails, for tests
#[cfg(test)]
pub struct FailingTool {
    pub name: String,
    pub message: String,
}

#[cfg(test)]
#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { "Always fails" }
    fn parameters(&self) -> Value { serde_json::json!({"type": "object"}) }

    async fn execute(&self, _arguments: Value) -> Result<Value> {
        Err(crate::Error::tool(&self.name, &self.message))
    }
}

/// Tool that panics, for tests
#[cfg(test)]
pub struct PanickingTool;

#[cfg(test)]
#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str { "panicky" }
    fn description(&self) -> &str { "Panics when executed" }
    fn parameters(&self) -> Value { serde_json::json!({"type": "object"}) }

    async fn execute(&self, _arguments: Value) -> Result<Value> {
        panic!("tool blew up")
    }
}

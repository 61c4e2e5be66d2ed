//! Agent step - one model invocation plus tool dispatch

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Error;
use crate::tools::ToolRegistry;
use crate::Result;

use super::conversation::Conversation;
use super::llm::LlmClient;
use super::message::{Message, ToolCall};

/// Name used in a tool result when the model omitted the tool name.
pub const UNKNOWN_TOOL_NAME: &str = "unknown_tool_name_in_error";

/// Call id used in a tool result when the model omitted the call id.
pub const UNKNOWN_CALL_ID: &str = "unknown_tool_call_id_in_error";

/// Result of a single [`AgentStep::run`].
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub conversation: Conversation,
    /// The model produced a final answer with no tool calls.
    pub terminal: bool,
}

/// Sends the conversation to the model and resolves any tool calls it asks for.
pub struct AgentStep<C: LlmClient> {
    client: C,
    tools: Arc<ToolRegistry>,
}

impl<C: LlmClient> AgentStep<C> {
    pub fn new(client: C, tools: Arc<ToolRegistry>) -> Self {
        Self { client, tools }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one step.
    ///
    /// Only a failed model call is returned as an error. Every tool call in
    /// the response gets exactly one tool result, appended in call order,
    /// whether the call succeeded or not.
    pub async fn run(&self, conversation: Conversation) -> Result<StepOutcome> {
        let definitions = self.tools.definitions();
        let response = self
            .client
            .invoke(conversation.messages(), &definitions)
            .await?;

        if !response.has_tool_calls() {
            debug!("Model returned a final answer");
            return Ok(StepOutcome {
                conversation: conversation.push(response.into_message()),
                terminal: true,
            });
        }

        let assistant = response.into_message();
        let mut results = Vec::with_capacity(assistant.tool_calls().len());
        for call in assistant.tool_calls() {
            results.push(self.execute_call(call).await);
        }

        Ok(StepOutcome {
            conversation: conversation.push(assistant).append(results),
            terminal: false,
        })
    }

    async fn execute_call(&self, call: &ToolCall) -> Message {
        if call.name.is_empty() || call.call_id.is_empty() {
            let err = Error::InvalidToolCall(format!(
                "missing name or call_id in {}",
                serde_json::to_string(call).unwrap_or_else(|_| format!("{call:?}"))
            ));
            warn!("{}", err);
            return Message::tool_result(
                non_empty_or(&call.name, UNKNOWN_TOOL_NAME),
                non_empty_or(&call.call_id, UNKNOWN_CALL_ID),
                format!("Error: {err}"),
            );
        }

        let tool = match self.tools.resolve(&call.name) {
            Ok(tool) => tool,
            Err(err) => {
                warn!("{}", err);
                return Message::tool_result(&call.name, &call.call_id, format!("Error: {err}"));
            }
        };

        debug!("Executing tool: {} with args: {}", call.name, call.arguments);

        let outcome = AssertUnwindSafe(tool.execute(call.arguments.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(Error::tool(&call.name, panic_message(panic))));

        let content = match outcome {
            Ok(value) => canonical_text(&value),
            Err(err) => {
                warn!("Tool {} failed: {}", call.name, err);
                format!("Error executing tool {}: {}", call.name, err)
            }
        };
        debug!("Tool {} produced {} chars", call.name, content.len());

        Message::tool_result(&call.name, &call.call_id, content)
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

/// Compact JSON text of a tool's return value.
fn canonical_text(value: &Value) -> String {
    value.to_string()
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::{FakeLlmClient, LlmResponse};
    use crate::tools::{CurrentTimeTool, FailingTool, PanickingTool, StaticTool};
    use serde_json::json;

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(CurrentTimeTool).unwrap();
        registry
            .register(StaticTool {
                name: "echo".to_string(),
                result: json!({"b": 2, "a": [1, "x"]}),
            })
            .unwrap();
        registry
            .register(FailingTool {
                name: "broken".to_string(),
                message: "disk on fire".to_string(),
            })
            .unwrap();
        registry.register(PanickingTool).unwrap();
        Arc::new(registry)
    }

    fn step_with(calls: Vec<ToolCall>) -> AgentStep<FakeLlmClient> {
        AgentStep::new(
            FakeLlmClient::scripted(vec![LlmResponse::tool_calls(calls)]),
            registry(),
        )
    }

    fn results(outcome: &StepOutcome) -> Vec<(&str, &str, &str)> {
        outcome
            .conversation
            .messages()
            .iter()
            .filter_map(|m| match m {
                Message::ToolResult { name, call_id, content } => {
                    Some((name.as_str(), call_id.as_str(), content.as_str()))
                }
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_final_answer_is_terminal() {
        let step = AgentStep::new(FakeLlmClient::new(vec!["Hello, human!"]), registry());
        let outcome = step.run(Conversation::new(Message::human("Hi"))).await.unwrap();

        assert!(outcome.terminal);
        assert_eq!(outcome.conversation.len(), 2);
        assert_eq!(outcome.conversation.final_answer(), Some("Hello, human!"));
    }

    #[tokio::test]
    async fn test_one_result_per_call_in_order() {
        let calls = vec![
            ToolCall::new("echo", json!({}), "c1"),
            ToolCall::new("get_current_time", json!({}), "c2"),
            ToolCall::new("nonexistent_tool", json!({}), "c3"),
            ToolCall::new("broken", json!({}), "c4"),
        ];
        let step = step_with(calls.clone());
        let outcome = step.run(Conversation::new(Message::human("go"))).await.unwrap();

        assert!(!outcome.terminal);
        // human + assistant + one result per call
        assert_eq!(outcome.conversation.len(), 2 + calls.len());
        assert_eq!(outcome.conversation.messages()[1].tool_calls(), calls.as_slice());

        let ids: Vec<&str> = results(&outcome).iter().map(|r| r.1).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3", "c4"]);
    }

    #[tokio::test]
    async fn test_success_is_compact_json() {
        let step = step_with(vec![ToolCall::new("echo", json!({}), "c1")]);
        let outcome = step.run(Conversation::new(Message::human("go"))).await.unwrap();

        let (name, _, content) = results(&outcome)[0];
        assert_eq!(name, "echo");
        let parsed: Value = serde_json::from_str(content).unwrap();
        assert_eq!(parsed, json!({"a": [1, "x"], "b": 2}));
        assert!(!content.contains(' '));
    }

    #[tokio::test]
    async fn test_time_tool_result() {
        let step = step_with(vec![ToolCall::new("get_current_time", json!({}), "c1")]);
        let outcome = step.run(Conversation::new(Message::human("time?"))).await.unwrap();

        let (_, _, content) = results(&outcome)[0];
        let parsed: Value = serde_json::from_str(content).unwrap();
        assert!(parsed["utc"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_failing_tool_is_isolated() {
        let step = step_with(vec![
            ToolCall::new("broken", json!({}), "c1"),
            ToolCall::new("echo", json!({}), "c2"),
        ]);
        let outcome = step.run(Conversation::new(Message::human("go"))).await.unwrap();

        assert!(!outcome.terminal);
        let results = results(&outcome);
        assert!(results[0].2.contains("broken"));
        assert!(results[0].2.contains("disk on fire"));
        assert!(results[1].2.starts_with('{'));
    }

    #[tokio::test]
    async fn test_panicking_tool_is_isolated() {
        let step = step_with(vec![
            ToolCall::new("panicky", json!({}), "c1"),
            ToolCall::new("echo", json!({}), "c2"),
        ]);
        let outcome = step.run(Conversation::new(Message::human("go"))).await.unwrap();

        let results = results(&outcome);
        assert_eq!(results.len(), 2);
        assert!(results[0].2.contains("panicky"));
        assert!(results[0].2.contains("tool blew up"));
    }

    #[tokio::test]
    async fn test_unknown_tool_names_tool() {
        let step = step_with(vec![ToolCall::new("nonexistent_tool", json!({}), "c1")]);
        let outcome = step.run(Conversation::new(Message::human("go"))).await.unwrap();

        let (name, call_id, content) = results(&outcome)[0];
        assert_eq!(name, "nonexistent_tool");
        assert_eq!(call_id, "c1");
        assert!(content.contains("nonexistent_tool"));
    }

    #[tokio::test]
    async fn test_missing_fields_use_placeholders() {
        let step = step_with(vec![
            ToolCall::new("", json!({}), "c1"),
            ToolCall::new("echo", json!({}), ""),
            ToolCall::new("get_current_time", json!({}), "c3"),
        ]);
        let outcome = step.run(Conversation::new(Message::human("go"))).await.unwrap();

        let results = results(&outcome);
        assert_eq!(results.len(), 3);
        assert_eq!((results[0].0, results[0].1), (UNKNOWN_TOOL_NAME, "c1"));
        assert_eq!((results[1].0, results[1].1), ("echo", UNKNOWN_CALL_ID));
        assert!(results[0].2.contains("Invalid tool call"));
        assert_eq!(results[2].1, "c3");
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let step = AgentStep::new(FakeLlmClient::failing("quota exceeded"), registry());
        let err = step.run(Conversation::new(Message::human("go"))).await.unwrap_err();

        assert!(matches!(err, Error::ModelInvocation(ref m) if m.contains("quota")));
    }

    #[tokio::test]
    async fn test_model_sees_full_history() {
        let step = step_with(vec![ToolCall::new("echo", json!({}), "c1")]);
        let seed = Conversation::new(Message::human("first"))
            .push(Message::assistant("ok"))
            .push(Message::human("second"));
        step.run(seed.clone()).await.unwrap();

        let seen = step.client().seen.lock().unwrap();
        assert_eq!(seen[0], seed.messages());
    }
}

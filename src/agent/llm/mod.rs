//! LLM client abstraction layer.
//!
//! This module provides:
//! - [`LlmClient`] trait, the opaque model-invocation capability
//! - [`GeminiClient`], the Gemini `generateContent` implementation
//! - a scripted fake client for tests

mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::tools::ToolDefinition;
use crate::Result;

pub use types::*;

pub mod gemini;

pub use gemini::GeminiClient;

use super::message::{Message, ToolCall};

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Text content of the response.
    pub content: Option<String>,

    /// Tool calls requested by the LLM, in emitted order.
    pub tool_calls: Vec<ToolCall>,

    /// Reason the response finished.
    pub finish_reason: String,

    /// Token usage statistics.
    pub usage: Usage,
}

impl LlmResponse {
    /// Create a simple text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }

    /// Create a response that only requests tool calls.
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
            finish_reason: "tool_calls".to_string(),
            usage: Usage::default(),
        }
    }

    /// Check if response has tool calls.
    #[inline]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Turn the response into the assistant message appended to the conversation.
    pub fn into_message(self) -> Message {
        Message::assistant_with_tools(self.content.unwrap_or_default(), self.tool_calls)
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// LLM client trait — swappable provider abstraction.
///
/// Implementations own transport, auth and timeouts. Failures surface as
/// [`crate::Error::ModelInvocation`] and are not retried by the caller.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the full ordered history and get the next response.
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse>;

    /// Get the model this client talks to.
    fn model(&self) -> &str;
}

/// Fake LLM client for testing.
///
/// Pops scripted responses in order and records every history it was sent.
#[cfg(test)]
pub struct FakeLlmClient {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<LlmResponse>>>,
    pub seen: std::sync::Mutex<Vec<Vec<Message>>>,
}

#[cfg(test)]
impl FakeLlmClient {
    /// Create with predefined text responses.
    pub fn new(responses: Vec<&str>) -> Self {
        Self::scripted(responses.iter().map(|s| LlmResponse::text(*s)).collect())
    }

    /// Create with arbitrary responses.
    pub fn scripted(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into_iter().map(Ok).collect()),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create a client whose first call fails.
    pub fn failing(message: &str) -> Self {
        let client = Self::scripted(vec![]);
        client
            .responses
            .lock()
            .unwrap()
            .push_back(Err(crate::Error::ModelInvocation(message.to_string())));
        client
    }

    /// Create with a single tool call followed by a text response.
    pub fn with_tool_call(name: &str, args: serde_json::Value, final_response: &str) -> Self {
        Self::scripted(vec![
            LlmResponse::tool_calls(vec![ToolCall::new(name, args, "tc_1")]),
            LlmResponse::text(final_response),
        ])
    }

    /// Number of times the client was invoked.
    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn invoke(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        responses.pop_front().unwrap_or_else(|| {
            Err(crate::Error::ModelInvocation("No more fake responses".to_string()))
        })
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

//! Gemini LLM client implementation (API key authentication).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::Error;
use crate::tools::ToolDefinition;
use crate::Result;

use super::super::message::{Message, ToolCall};
use super::super::UNKNOWN_CALL_ID;
use super::{GeminiResponse, LlmClient, LlmResponse, Usage};

/// Gemini API client using API key authentication.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    api_base: String,
    temperature: f32,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client from configuration.
    ///
    /// Fails when no API key is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?;
        Ok(Self {
            api_key: api_key.to_string(),
            model: config.model.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            client: Client::new(),
        })
    }

    fn build_url(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        )
    }

    fn convert_messages(messages: &[Message]) -> Vec<Value> {
        let mut contents = Vec::with_capacity(messages.len());
        let mut iter = messages.iter().peekable();

        while let Some(m) = iter.next() {
            match m {
                Message::Human { content } => contents.push(json!({
                    "role": "user",
                    "parts": [{"text": content}]
                })),
                Message::Assistant { content, tool_calls } => {
                    let mut parts = Vec::with_capacity(tool_calls.len() + 1);
                    if !content.is_empty() {
                        parts.push(json!({"text": content}));
                    }
                    for tc in tool_calls {
                        let args = if tc.arguments.is_null() { json!({}) } else { tc.arguments.clone() };
                        let mut call = json!({
                            "name": tc.name,
                            "args": args
                        });
                        if let Some(id) = wire_id(&tc.call_id) {
                            call["id"] = json!(id);
                        }
                        parts.push(json!({"functionCall": call}));
                    }
                    // Gemini rejects a turn without parts.
                    if parts.is_empty() {
                        continue;
                    }
                    contents.push(json!({
                        "role": "model",
                        "parts": parts
                    }));
                }
                Message::ToolResult { name, call_id, content } => {
                    // All results answering one model turn share a single entry.
                    let mut parts = vec![function_response(name, call_id, content)];
                    while let Some(Message::ToolResult { name, call_id, content }) =
                        iter.next_if(|n| matches!(n, Message::ToolResult { .. }))
                    {
                        parts.push(function_response(name, call_id, content));
                    }
                    contents.push(json!({
                        "role": "function",
                        "parts": parts
                    }));
                }
            }
        }

        contents
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Option<Value> {
        if tools.is_empty() {
            return None;
        }

        let function_declarations: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters
                })
            })
            .collect();

        Some(json!([{
            "functionDeclarations": function_declarations
        }]))
    }

    fn build_request(&self, messages: &[Message], tools: &[ToolDefinition]) -> Value {
        let mut request = json!({
            "contents": Self::convert_messages(messages),
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": 8192
            }
        });

        if let Some(tool_config) = Self::convert_tools(tools) {
            request["tools"] = tool_config;
        }

        request
    }

    fn parse_response(response: GeminiResponse) -> Result<LlmResponse> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::ModelInvocation("No candidates in response".to_string()))?;

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();

        for part in candidate.content.parts {
            if let Some(text) = part.text {
                texts.push(text);
            }

            if let Some(fc) = part.function_call {
                let call_id = fc
                    .id
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| format!("{}{}", GENERATED_ID_PREFIX, Uuid::new_v4()));
                tool_calls.push(ToolCall::new(fc.name, fc.args, call_id));
            }
        }

        let usage = response
            .usage_metadata
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count.unwrap_or(0),
                completion_tokens: u.candidates_token_count.unwrap_or(0),
                total_tokens: u.total_token_count.unwrap_or(0),
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content: if texts.is_empty() { None } else { Some(texts.concat()) },
            tool_calls,
            finish_reason: candidate
                .finish_reason
                .unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }
}

/// Prefix of call ids generated locally when Gemini sends none.
const GENERATED_ID_PREFIX: &str = "tempo_call_";

/// The call id to echo back to Gemini: only ids Gemini itself assigned.
fn wire_id(call_id: &str) -> Option<&str> {
    if call_id.is_empty() || call_id == UNKNOWN_CALL_ID || call_id.starts_with(GENERATED_ID_PREFIX) {
        None
    } else {
        Some(call_id)
    }
}

fn function_response(name: &str, call_id: &str, content: &str) -> Value {
    // Successful tool output is JSON text; error text is passed as a string.
    let result = serde_json::from_str::<Value>(content)
        .unwrap_or_else(|_| Value::String(content.to_string()));
    let mut response = json!({
        "name": name,
        "response": {"result": result}
    });
    if let Some(id) = wire_id(call_id) {
        response["id"] = json!(id);
    }
    json!({"functionResponse": response})
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        let request = self.build_request(messages, tools);
        debug!("Sending {} messages to {}", messages.len(), self.model);

        let response = self
            .client
            .post(self.build_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ModelInvocation(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::ModelInvocation(format!(
                "Gemini API error ({status}): {error_text}"
            )));
        }

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| Error::ModelInvocation(format!("invalid response body: {e}")))?;
        let parsed = Self::parse_response(gemini_response)?;
        debug!(
            "Gemini returned {} tool calls, {} tokens",
            parsed.tool_calls.len(),
            parsed.usage.total_tokens
        );
        Ok(parsed)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> GeminiClient {
        let config = Config {
            gemini_api_key: "test-key".to_string(),
            ..Config::default()
        };
        GeminiClient::from_config(&config).unwrap()
    }

    #[test]
    fn test_requires_api_key() {
        let err = GeminiClient::from_config(&Config::default()).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_build_url() {
        let url = test_client().build_url();
        assert!(url.ends_with("/gemini-2.0-flash-001:generateContent?key=test-key"));
    }

    #[test]
    fn test_convert_messages_roles() {
        let messages = vec![
            Message::human("What time is it?"),
            Message::assistant_with_tools(
                "",
                vec![
                    ToolCall::new("get_current_time", Value::Null, "tc_1"),
                    ToolCall::new("missing", json!({}), "tc_2"),
                ],
            ),
            Message::tool_result("get_current_time", "tc_1", r#"{"utc":"2025-05-21T06:42:00Z"}"#),
            Message::tool_result("missing", "tc_2", "Error: tool 'missing' not found"),
        ];

        let contents = GeminiClient::convert_messages(&messages);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "get_current_time");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["args"], json!({}));
        assert_eq!(contents[2]["role"], "function");
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"]["response"]["result"]["utc"],
            "2025-05-21T06:42:00Z"
        );
        assert_eq!(
            contents[2]["parts"][1]["functionResponse"]["response"]["result"],
            "Error: tool 'missing' not found"
        );
    }

    #[test]
    fn test_results_of_one_turn_share_an_entry() {
        let messages = vec![
            Message::human("time twice"),
            Message::assistant_with_tools(
                "",
                vec![
                    ToolCall::new("get_current_time", json!({}), "gem-1"),
                    ToolCall::new("get_current_time", json!({}), "tempo_call_local"),
                ],
            ),
            Message::tool_result("get_current_time", "gem-1", r#"{"utc":"a"}"#),
            Message::tool_result("get_current_time", "tempo_call_local", r#"{"utc":"b"}"#),
            Message::assistant(""),
        ];

        let contents = GeminiClient::convert_messages(&messages);
        assert_eq!(contents.len(), 3);

        let calls = contents[1]["parts"].as_array().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0]["functionCall"]["id"], "gem-1");
        assert!(calls[1]["functionCall"].get("id").is_none());

        assert_eq!(contents[2]["role"], "function");
        let responses = contents[2]["parts"].as_array().unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["functionResponse"]["id"], "gem-1");
        assert_eq!(responses[1]["functionResponse"]["response"]["result"]["utc"], "b");
        assert!(responses[1]["functionResponse"].get("id").is_none());
    }

    #[test]
    fn test_separate_turns_keep_separate_entries() {
        let messages = vec![
            Message::human("go"),
            Message::assistant_with_tools("", vec![ToolCall::new("a", json!({}), "call_1")]),
            Message::tool_result("a", "call_1", "{}"),
            Message::assistant_with_tools("", vec![ToolCall::new("b", json!({}), "call_2")]),
            Message::tool_result("b", "call_2", "{}"),
        ];

        let contents = GeminiClient::convert_messages(&messages);
        let roles: Vec<&str> = contents.iter().map(|c| c["role"].as_str().unwrap()).collect();
        assert_eq!(roles, vec!["user", "model", "function", "model", "function"]);
    }

    #[test]
    fn test_request_includes_tools() {
        let tools = vec![ToolDefinition {
            name: "get_current_time".to_string(),
            description: "time".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let request = test_client().build_request(&[Message::human("hi")], &tools);

        assert_eq!(request["generationConfig"]["temperature"], 0.0);
        assert_eq!(
            request["tools"][0]["functionDeclarations"][0]["name"],
            "get_current_time"
        );

        let without_tools = test_client().build_request(&[Message::human("hi")], &[]);
        assert!(without_tools.get("tools").is_none());
    }

    #[test]
    fn test_parse_function_call_response() {
        let raw = json!({
            "candidates": [{
                "content": {"parts": [
                    {"functionCall": {"name": "get_current_time", "args": {}}},
                    {"functionCall": {"id": "abc", "name": "other", "args": {"x": 1}}}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5}
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let parsed = GeminiClient::parse_response(response).unwrap();

        assert_eq!(parsed.content, None);
        assert_eq!(parsed.tool_calls.len(), 2);
        assert!(parsed.tool_calls[0].call_id.starts_with(GENERATED_ID_PREFIX));
        assert_eq!(parsed.tool_calls[1].call_id, "abc");
        assert_eq!(parsed.tool_calls[1].arguments, json!({"x": 1}));
        assert_eq!(parsed.usage.total_tokens, 5);
    }

    #[test]
    fn test_parse_text_response() {
        let raw = json!({
            "candidates": [{
                "content": {"parts": [{"text": "It is "}, {"text": "06:42 UTC."}]}
            }]
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let parsed = GeminiClient::parse_response(response).unwrap();

        assert_eq!(parsed.content.as_deref(), Some("It is 06:42 UTC."));
        assert!(!parsed.has_tool_calls());
        assert_eq!(parsed.finish_reason, "stop");
    }

    #[test]
    fn test_parse_no_candidates() {
        let response: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        let err = GeminiClient::parse_response(response).unwrap_err();
        assert!(matches!(err, Error::ModelInvocation(_)));
    }
}

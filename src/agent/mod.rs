//! Agent module — core agent logic.
//!
//! This module contains:
//! - Message types and the append-only [`Conversation`] log
//! - LLM client trait and the Gemini implementation
//! - [`AgentStep`]: one model call plus tool dispatch
//! - [`AgentLoop`]: repeats steps until the model answers without tool calls

mod conversation;
mod loop_impl;
mod message;
mod step;

// LLM providers in submodule
pub mod llm;

// Re-exports for convenience
pub use conversation::Conversation;
pub use llm::{GeminiClient, LlmClient, LlmResponse, Usage};
pub use loop_impl::{next_state, AgentLoop, CancelFlag, LoopState};
pub use message::{Message, Role, ToolCall};
pub use step::{AgentStep, StepOutcome, UNKNOWN_CALL_ID, UNKNOWN_TOOL_NAME};

//! Agent loop - drives agent steps until the model gives a final answer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Error;
use crate::tools::ToolRegistry;
use crate::Result;

use super::conversation::Conversation;
use super::llm::LlmClient;
use super::message::Message;
use super::step::AgentStep;

/// Loop controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Done,
}

/// Decide whether another step is needed, from the trailing message.
pub fn next_state(conversation: &Conversation) -> LoopState {
    match conversation.last() {
        // Tool output goes back to the model.
        Some(Message::ToolResult { .. }) => LoopState::Running,
        // Unreachable while steps resolve calls synchronously; kept in case
        // tool execution is ever deferred.
        Some(Message::Assistant { tool_calls, .. }) if !tool_calls.is_empty() => LoopState::Running,
        Some(Message::Assistant { .. }) => LoopState::Done,
        Some(Message::Human { .. }) | None => LoopState::Done,
    }
}

/// Cooperative cancellation, checked between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The agent loop processes a conversation through LLM and tool execution
pub struct AgentLoop<C: LlmClient> {
    step: AgentStep<C>,
    max_iterations: usize,
    cancel: CancelFlag,
}

impl<C: LlmClient> AgentLoop<C> {
    /// Create a new agent loop
    pub fn new(client: C, tools: Arc<ToolRegistry>, max_iterations: usize) -> Self {
        Self {
            step: AgentStep::new(client, tools),
            max_iterations,
            cancel: CancelFlag::new(),
        }
    }

    /// Use an externally owned cancellation flag
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn step(&self) -> &AgentStep<C> {
        &self.step
    }

    /// Run the agent loop for a single human message
    pub async fn run(&self, message: impl Into<String>) -> Result<Conversation> {
        let message = message.into();
        info!("Starting agent loop with message: {}", message);
        self.run_conversation(Conversation::new(Message::human(message))).await
    }

    /// Drive an already seeded conversation until it is done
    pub async fn run_conversation(&self, mut conversation: Conversation) -> Result<Conversation> {
        let mut state = LoopState::Running;
        let mut iteration = 0;

        while state == LoopState::Running {
            if self.cancel.is_cancelled() {
                info!("Agent loop cancelled after {} steps", iteration);
                return Err(Error::Cancelled);
            }
            if iteration >= self.max_iterations {
                return Err(Error::MaxIterations(self.max_iterations));
            }
            iteration += 1;
            debug!("Iteration {}/{}", iteration, self.max_iterations);

            let outcome = self.step.run(conversation).await?;
            conversation = outcome.conversation;
            state = next_state(&conversation);
            debug_assert_eq!(outcome.terminal, state == LoopState::Done);
        }

        info!(
            "Agent completed after {} steps with {} messages",
            iteration,
            conversation.len()
        );
        Ok(conversation)
    }
}

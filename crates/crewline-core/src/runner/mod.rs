//! Agent runner — the opaque seam that produces agent output.
//!
//! The supervisor drives tasks as short conversations: it sends the task
//! prompt, the runner returns the next assistant text, and single-line tool
//! directives in that text (`SEARCH:` / `FETCH:` / `ASK_HUMAN:`) are
//! interpreted by the run loop against the agent's resolved capability set.
//!
//! [`HttpAgentRunner`] talks to an Anthropic-compatible Messages API; tests
//! substitute a scripted implementation through the same trait.

pub mod http;
pub mod tools;

pub use http::{HttpAgentRunner, HttpRunnerConfig};

use async_trait::async_trait;

use crate::crew::CrewAgent;
use crate::error::CoreError;

/// Who said what in a task conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a task conversation.
#[derive(Debug, Clone)]
pub struct AgentMessage {
    pub role: Role,
    pub content: String,
}

impl AgentMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Produces the next assistant turn for an agent.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn complete(
        &self,
        agent: &CrewAgent,
        messages: &[AgentMessage],
    ) -> Result<String, CoreError>;
}

//! YAML schema types for crew definition files.
//!
//! An `agents.yaml` maps agent ids to their definitions:
//!
//! ```yaml
//! researcher:
//!   role: "Research Analyst"
//!   goal: "Gather accurate background material on {topic}"
//!   backstory: "A meticulous analyst with a knack for finding sources."
//!   tools:
//!     - remote-search
//!     - page-fetch
//! writer:
//!   role: "Copywriter"
//!   goal: "Write the final summary"
//!   backstory: "Short sentences, no fluff."
//!   tools:
//!     - human-input
//! ```
//!
//! A `tasks.yaml` maps task ids to descriptions and the agent that owns them:
//!
//! ```yaml
//! research:
//!   description: "Collect key facts about {topic}"
//!   expected_output: "A bullet list of facts"
//!   agent: researcher
//! summarize:
//!   description: "Summarize the research into one paragraph"
//!   agent: writer
//!   human_input: true
//! ```
//!
//! A `process.yaml` wires them together under a top-level `crew:` key:
//!
//! ```yaml
//! crew:
//!   process: sequential    # sequential | hierarchical | parallel
//!   agents: [researcher, writer]
//!   tasks: [research, summarize]
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One agent definition from `agents.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentDef {
    #[serde(default)]
    pub role: String,

    #[serde(default)]
    pub goal: String,

    #[serde(default)]
    pub backstory: String,

    #[serde(default)]
    pub allow_delegation: bool,

    /// Tool names resolved into the closed capability set at build time.
    #[serde(default)]
    pub tools: Vec<String>,
}

/// One task definition from `tasks.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskDef {
    /// Task description. May reference caller inputs as `{key}` placeholders.
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub expected_output: String,

    /// Id of the agent that executes this task.
    /// Accepts the legacy `agents:` key as an alias.
    #[serde(default, alias = "agents")]
    pub agent: Option<String>,

    /// Ask a human to review the task output before it is accepted.
    #[serde(default)]
    pub human_input: bool,
}

/// How the crew's tasks are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessKind {
    /// Run tasks one after another (default)
    #[default]
    Sequential,
    /// Sequential, with a manager framing each task prompt
    Hierarchical,
    /// Run all tasks concurrently
    Parallel,
}

/// The `crew:` block of `process.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CrewProcess {
    #[serde(default)]
    pub process: ProcessKind,

    /// Agent ids participating in this crew, in declaration order.
    #[serde(default)]
    pub agents: Vec<String>,

    /// Task ids to execute, in declaration order.
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// Top-level shape of `process.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProcessFile {
    pub crew: CrewProcess,
}

/// Contents of `agents.yaml`: agent id → definition.
pub type AgentsFile = HashMap<String, AgentDef>;

/// Contents of `tasks.yaml`: task id → definition.
pub type TasksFile = HashMap<String, TaskDef>;

/// A fully loaded crew definition — the three files plus the crew name.
#[derive(Debug, Clone)]
pub struct CrewBundle {
    pub name: String,
    pub process: CrewProcess,
    pub agents: AgentsFile,
    pub tasks: TasksFile,
}

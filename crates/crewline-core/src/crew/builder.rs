//! Crew builder — turns a loaded [`CrewBundle`] plus caller inputs into a
//! runnable [`Crew`].
//!
//! Building is synchronous and deterministic. Everything that can fail —
//! a `{placeholder}` with no matching input, an unknown agent or tool name —
//! fails here, before any background task is spawned, so the caller gets a
//! plain request-level error instead of an `error` event inside a stream.

use std::collections::HashMap;

use crate::crew::schema::{CrewBundle, ProcessKind};
use crate::error::CoreError;

/// The closed set of optional agent capabilities, resolved once at build
/// time from the tool names in `agents.yaml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    RemoteSearch,
    PageFetch,
    HumanInput,
}

impl Capability {
    pub fn from_tool_name(name: &str) -> Option<Self> {
        match name {
            "remote-search" | "search" => Some(Capability::RemoteSearch),
            "page-fetch" | "scrape" => Some(Capability::PageFetch),
            "human-input" | "human" => Some(Capability::HumanInput),
            _ => None,
        }
    }
}

/// A resolved agent, ready to execute tasks.
#[derive(Debug, Clone)]
pub struct CrewAgent {
    pub id: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub allow_delegation: bool,
    pub capabilities: Vec<Capability>,
}

impl CrewAgent {
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// A resolved task: description already interpolated, agent already bound.
#[derive(Debug, Clone)]
pub struct CrewTask {
    pub id: String,
    pub description: String,
    pub expected_output: String,
    /// Index into [`Crew::agents`].
    pub agent: usize,
    pub human_input: bool,
}

/// A runnable crew. One [`crate::run::RunHandle`] per invocation.
#[derive(Debug, Clone)]
pub struct Crew {
    pub name: String,
    pub process: ProcessKind,
    pub agents: Vec<CrewAgent>,
    pub tasks: Vec<CrewTask>,
}

/// Build a [`Crew`] from its definition files and the caller's input map.
pub fn build_crew(bundle: &CrewBundle, inputs: &HashMap<String, String>) -> Result<Crew, CoreError> {
    let mut agents = Vec::with_capacity(bundle.process.agents.len());
    for agent_id in &bundle.process.agents {
        let def = bundle.agents.get(agent_id).ok_or_else(|| {
            CoreError::InvalidCrew(format!("process references unknown agent '{}'", agent_id))
        })?;

        let mut capabilities = Vec::new();
        for tool in &def.tools {
            let capability = Capability::from_tool_name(tool).ok_or_else(|| {
                CoreError::InvalidCrew(format!("agent '{}' lists unknown tool '{}'", agent_id, tool))
            })?;
            if !capabilities.contains(&capability) {
                capabilities.push(capability);
            }
        }

        agents.push(CrewAgent {
            id: agent_id.clone(),
            role: def.role.clone(),
            goal: render_template(&def.goal, inputs)?,
            backstory: def.backstory.clone(),
            allow_delegation: def.allow_delegation,
            capabilities,
        });
    }

    if bundle.process.tasks.is_empty() {
        return Err(CoreError::InvalidCrew(format!("crew '{}' has no tasks", bundle.name)));
    }

    let mut tasks = Vec::with_capacity(bundle.process.tasks.len());
    for task_id in &bundle.process.tasks {
        let def = bundle.tasks.get(task_id).ok_or_else(|| {
            CoreError::InvalidCrew(format!("process references unknown task '{}'", task_id))
        })?;

        let agent_id = def.agent.as_deref().ok_or_else(|| {
            CoreError::InvalidCrew(format!("task '{}' has no agent", task_id))
        })?;
        let agent = agents.iter().position(|a| a.id == agent_id).ok_or_else(|| {
            CoreError::InvalidCrew(format!(
                "task '{}' references agent '{}' which is not in the crew",
                task_id, agent_id
            ))
        })?;

        tasks.push(CrewTask {
            id: task_id.clone(),
            description: render_template(&def.description, inputs)?,
            expected_output: def.expected_output.clone(),
            agent,
            human_input: def.human_input,
        });
    }

    Ok(Crew {
        name: bundle.name.clone(),
        process: bundle.process.process,
        agents,
        tasks,
    })
}

/// Interpolate `{key}` placeholders from the input map.
///
/// Same brace rules as Python's `str.format`: `{{` and `}}` produce literal
/// braces; an unmatched key is a [`CoreError::MissingInput`].
pub fn render_template(template: &str, inputs: &HashMap<String, String>) -> Result<String, CoreError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => key.push(c),
                        None => {
                            return Err(CoreError::InvalidCrew(format!(
                                "unclosed '{{' in template: {}",
                                template
                            )))
                        }
                    }
                }
                let value = inputs
                    .get(&key)
                    .ok_or_else(|| CoreError::MissingInput(key.clone()))?;
                out.push_str(value);
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                }
                out.push('}');
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

//! Crew definitions — YAML-backed teams of agents with ordered task lists.
//!
//! Each crew lives in its own directory of three YAML files:
//!
//! ```text
//! crews/<name>/
//!   agents.yaml    ──► AgentDef per agent id
//!   tasks.yaml     ──► TaskDef per task id
//!   process.yaml   ──► ProcessFile (kind + ordered agent/task id lists)
//! ```
//!
//! [`CrewStore`] handles CRUD on that layout; [`build_crew`] turns a loaded
//! [`CrewBundle`] plus caller inputs into a runnable [`Crew`], resolving
//! template placeholders and agent capabilities up front so every
//! construction failure is reported before a run starts.

pub mod builder;
pub mod schema;
pub mod store;

pub use builder::{build_crew, Capability, Crew, CrewAgent, CrewTask};
pub use schema::{AgentDef, AgentsFile, CrewBundle, CrewProcess, ProcessFile, ProcessKind, TaskDef, TasksFile};
pub use store::CrewStore;

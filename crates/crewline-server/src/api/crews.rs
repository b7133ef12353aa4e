//! Crew definition CRUD - /api/crew
//!
//! GET  /api/list-crews              - List crew names
//! POST /api/crew/{name}             - Create a crew with template files
//! DELETE /api/crew/{name}           - Delete a crew
//! GET/PUT /api/crew/{name}/agents   - The crew's agents.yaml
//! GET/PUT /api/crew/{name}/tasks    - The crew's tasks.yaml
//! GET/PUT /api/crew/{name}/process  - The crew's process.yaml

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crewline_core::crew::{AgentsFile, CrewProcess, TasksFile};
use crewline_core::CoreError;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{name}", post(create_crew).delete(delete_crew))
        .route("/{name}/agents", get(get_agents).put(put_agents))
        .route("/{name}/tasks", get(get_tasks).put(put_tasks))
        .route("/{name}/process", get(get_process).put(put_process))
}

/// GET /api/list-crews — List all crew names.
pub async fn list_crews(State(state): State<AppState>) -> Result<Json<Vec<String>>, CoreError> {
    Ok(Json(state.crew_store.list().await?))
}

/// POST /api/crew/{name} — Create a new crew with empty template files.
async fn create_crew(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), CoreError> {
    state.crew_store.create(&name).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": format!("Crew '{}' created successfully", name),
            "name": name,
        })),
    ))
}

/// DELETE /api/crew/{name} — Delete a crew and its definition files.
async fn delete_crew(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, CoreError> {
    state.crew_store.delete(&name).await?;
    Ok(Json(serde_json::json!({
        "message": format!("Crew '{}' deleted successfully", name),
    })))
}

/// GET /api/crew/{name}/agents
async fn get_agents(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, CoreError> {
    let agents = state.crew_store.agents(&name).await?;
    Ok(Json(serde_json::json!({ "agents": agents })))
}

#[derive(Debug, Deserialize)]
struct AgentsBody {
    agents: Option<AgentsFile>,
}

/// PUT /api/crew/{name}/agents
async fn put_agents(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<AgentsBody>,
) -> Result<Json<serde_json::Value>, CoreError> {
    let agents = body.agents.ok_or_else(|| {
        CoreError::BadRequest("Invalid data format. Expected 'agents' field".to_string())
    })?;
    state.crew_store.put_agents(&name, &agents).await?;
    Ok(Json(serde_json::json!({
        "message": format!("Agents for crew '{}' updated successfully", name),
    })))
}

/// GET /api/crew/{name}/tasks
async fn get_tasks(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, CoreError> {
    let tasks = state.crew_store.tasks(&name).await?;
    Ok(Json(serde_json::json!({ "tasks": tasks })))
}

#[derive(Debug, Deserialize)]
struct TasksBody {
    tasks: Option<TasksFile>,
}

/// PUT /api/crew/{name}/tasks
async fn put_tasks(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<TasksBody>,
) -> Result<Json<serde_json::Value>, CoreError> {
    let tasks = body.tasks.ok_or_else(|| {
        CoreError::BadRequest("Invalid data format. Expected 'tasks' field".to_string())
    })?;
    state.crew_store.put_tasks(&name, &tasks).await?;
    Ok(Json(serde_json::json!({
        "message": format!("Tasks for crew '{}' updated successfully", name),
    })))
}

/// GET /api/crew/{name}/process
async fn get_process(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, CoreError> {
    let process = state.crew_store.process(&name).await?;
    Ok(Json(serde_json::json!({
        "name": name,
        "process": process,
    })))
}

#[derive(Debug, Deserialize)]
struct ProcessBody {
    process: Option<CrewProcess>,
}

/// PUT /api/crew/{name}/process
async fn put_process(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<ProcessBody>,
) -> Result<Json<serde_json::Value>, CoreError> {
    let process = body.process.ok_or_else(|| {
        CoreError::BadRequest("Invalid data format. Expected 'process' field".to_string())
    })?;
    state.crew_store.put_process(&name, &process).await?;
    Ok(Json(serde_json::json!({
        "message": format!("Process for crew '{}' updated successfully", name),
        "name": name,
    })))
}

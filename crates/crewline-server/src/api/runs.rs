//! Run endpoint - POST /api/crew/{name}/run
//!
//! Builds the crew from its definition files plus the request's input map,
//! starts it on a background task, and streams its events back as
//! newline-delimited JSON. Construction failures (missing template input,
//! broken definition) come back as a plain error response before any
//! streaming begins.

use std::collections::HashMap;

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use crewline_core::crew::build_crew;
use crewline_core::run::{start_run, RunEvent};
use crewline_core::CoreError;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/{name}/run", post(run_crew))
}

/// POST /api/crew/{name}/run — Start a run and stream its events.
async fn run_crew(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(inputs): Json<HashMap<String, serde_json::Value>>,
) -> Result<impl IntoResponse, CoreError> {
    // Callers may pass numbers or booleans; template interpolation is textual.
    let inputs: HashMap<String, String> = inputs
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (k, v)
        })
        .collect();

    let bundle = state.crew_store.load_bundle(&name).await?;
    let crew = build_crew(&bundle, &inputs)?;
    let mut handle = start_run(crew, state.runner.clone(), state.broker.clone());

    tracing::info!("[Run] run {} started for crew '{}'", handle.id, name);

    let stream = async_stream::stream! {
        while let Some(event) = handle.events.recv().await {
            let terminal = matches!(
                event,
                RunEvent::FinalResult { .. } | RunEvent::Error { .. }
            );
            match serde_json::to_string(&event) {
                Ok(mut line) => {
                    line.push('\n');
                    yield Ok::<_, std::convert::Infallible>(Bytes::from(line));
                }
                Err(e) => {
                    tracing::error!("[Run] failed to serialize event: {}", e);
                }
            }
            if terminal {
                break;
            }
        }
    };

    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(stream),
    ))
}

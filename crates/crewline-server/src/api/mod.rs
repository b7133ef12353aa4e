pub mod crews;
pub mod input;
pub mod runs;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all sub-routes.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/list-crews", get(crews::list_crews))
        .nest("/api/crew", crews::router().merge(runs::router()))
        .merge(input::router())
}

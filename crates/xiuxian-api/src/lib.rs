//! Xiuxian narrative engine HTTP API.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Assembles every route of the service on `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/session", routes::session::router())
        .with_state(state)
}

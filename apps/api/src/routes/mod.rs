pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::tracker::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/tracker/submissions", post(handlers::handle_submit))
        .route("/api/v1/tracker/status", post(handlers::handle_check_status))
        .route(
            "/api/v1/tracker/conversions",
            post(handlers::handle_mark_converted),
        )
        .route(
            "/api/v1/tracker/conversions/pending",
            get(handlers::handle_pending_conversions),
        )
        .with_state(state)
}

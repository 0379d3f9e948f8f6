pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::orchestrator::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Sessions
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route("/api/v1/sessions/:id/search", post(handlers::handle_search))
        .route("/api/v1/sessions/:id/send", post(handlers::handle_send_all))
        .route("/api/v1/sessions/:id/status", get(handlers::handle_status))
        .route("/api/v1/sessions/:id/cancel", post(handlers::handle_cancel))
        .route("/api/v1/sessions/:id/reset", post(handlers::handle_reset))
        .route("/api/v1/sessions/:id/export", get(handlers::handle_export))
        // Prospects
        .route(
            "/api/v1/sessions/:id/prospects/:index",
            get(handlers::handle_get_prospect),
        )
        .route(
            "/api/v1/sessions/:id/prospects/:index/send",
            post(handlers::handle_send_one),
        )
        .with_state(state)
}

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers::{self, AppState};

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/system/action/handle_request",
            post(handlers::handle_actions),
        )
        .route(
            "/system/presenter/handle_request",
            post(handlers::handle_presenters),
        )
}

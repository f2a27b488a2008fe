use axum::{extract::State, http::StatusCode, response::Json, Json as RequestJson};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::action::ActionHandler;
use crate::error::ActionError;
use crate::model::{ActionRequest, ActionsResponse, PresenterRequest, UserContext};
use crate::presenter::PresenterHandler;
use crate::store::Datastore;

/// Shared state of all routes
#[derive(Clone)]
pub struct AppState {
    pub actions: ActionHandler,
    pub presenters: PresenterHandler,
}

impl AppState {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self {
            actions: ActionHandler::new(store.clone()),
            presenters: PresenterHandler::new(store),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status_code: u16, message: &str) -> Self {
        Self {
            success: false,
            status_code,
            message: message.to_string(),
        }
    }
}

type ErrorReply = (StatusCode, Json<ErrorResponse>);

fn error_reply(error: ActionError) -> ErrorReply {
    let code = error.status_code();
    log::warn!("Request failed with {}: {}", code, error);
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(ErrorResponse::new(code, &error.to_string())))
}

pub async fn handle_actions(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    RequestJson(requests): RequestJson<Vec<ActionRequest>>,
) -> Result<Json<ActionsResponse>, ErrorReply> {
    state
        .actions
        .handle_request(user.user_id, requests)
        .await
        .map(Json)
        .map_err(error_reply)
}

pub async fn handle_presenters(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    RequestJson(requests): RequestJson<Vec<PresenterRequest>>,
) -> Result<Json<Vec<Value>>, ErrorReply> {
    state
        .presenters
        .handle_request(user.user_id, requests)
        .await
        .map(Json)
        .map_err(error_reply)
}

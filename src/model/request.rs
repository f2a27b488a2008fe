use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Instance;

/// One entry of an action request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    pub data: Vec<Instance>,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, data: Vec<Instance>) -> Self {
        Self {
            action: action.into(),
            data,
        }
    }
}

/// Result of a single payload: `{"id": ..}` for creates, nothing otherwise
pub type ActionResult = Option<Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionsResponse {
    pub success: bool,
    pub message: String,
    /// One list per request entry, one element per payload
    pub results: Vec<Vec<ActionResult>>,
}

impl ActionsResponse {
    pub fn ok(results: Vec<Vec<ActionResult>>) -> Self {
        Self {
            success: true,
            message: "Actions handled successfully".to_string(),
            results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenterRequest {
    pub presenter: String,
    #[serde(default)]
    pub data: Value,
}

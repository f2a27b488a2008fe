use serde::{Deserialize, Serialize};

use crate::model::Id;

/// The user an action request runs as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Id,
}

impl UserContext {
    pub const ANONYMOUS_ID: Id = 0;

    pub fn new(user_id: Id) -> Self {
        Self { user_id }
    }

    /// Requests without a user header run as the anonymous user
    pub fn anonymous() -> Self {
        Self {
            user_id: Self::ANONYMOUS_ID,
        }
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

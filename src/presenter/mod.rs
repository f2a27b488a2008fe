pub mod search_users;

pub use search_users::{search_filter, search_users, SearchUsersRequest};

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ActionError;
use crate::model::{Id, PresenterRequest};
use crate::store::{Datastore, Transaction};

/// Read-only endpoints answered from the datastore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterKind {
    SearchUsers,
}

impl PresenterKind {
    pub fn name(&self) -> &'static str {
        match self {
            PresenterKind::SearchUsers => "search_users",
        }
    }
}

impl fmt::Display for PresenterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PresenterKind {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search_users" => Ok(PresenterKind::SearchUsers),
            _ => Err(ActionError::action(format!("Presenter {} does not exist.", s))),
        }
    }
}

#[derive(Clone)]
pub struct PresenterHandler {
    store: Arc<dyn Datastore>,
}

impl PresenterHandler {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// Answer each request in order. Nothing is written.
    pub async fn handle_request(
        &self,
        user_id: Id,
        requests: Vec<PresenterRequest>,
    ) -> Result<Vec<Value>, ActionError> {
        let mut tx = Transaction::new(self.store.clone());
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            let kind: PresenterKind = request.presenter.parse()?;
            log::info!("User {} runs presenter {}", user_id, kind);
            let result = match kind {
                PresenterKind::SearchUsers => search_users(&mut tx, user_id, &request.data).await?,
            };
            results.push(result);
        }
        Ok(results)
    }
}

use std::sync::Arc;

use crate::action::{ActionContext, ActionKind};
use crate::error::ActionError;
use crate::model::{ActionRequest, ActionsResponse, Id};
use crate::store::{Datastore, Transaction};

/// Entry point for action requests. Every request runs in its own
/// transaction and is committed as a whole or not at all.
#[derive(Clone)]
pub struct ActionHandler {
    store: Arc<dyn Datastore>,
}

impl ActionHandler {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub async fn handle_request(
        &self,
        user_id: Id,
        requests: Vec<ActionRequest>,
    ) -> Result<ActionsResponse, ActionError> {
        let mut tx = Transaction::new(self.store.clone());
        let mut results = Vec::with_capacity(requests.len());
        {
            let mut ctx = ActionContext::new(&mut tx, user_id);
            for request in requests {
                let kind: ActionKind = request.action.parse()?;
                log::info!(
                    "User {} runs {} with {} payloads",
                    user_id,
                    kind,
                    request.data.len()
                );
                results.push(ctx.execute(kind, request.data, false).await?);
            }
        }

        match tx.commit().await? {
            Some(position) => log::info!("Request committed at position {}", position),
            None => log::debug!("Request wrote nothing"),
        }
        Ok(ActionsResponse::ok(results))
    }
}

use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;

use crate::action::{Action, ActionBehavior, ActionKind};
use crate::error::ActionError;
use crate::logic::CascadeEngine;
use crate::model::relations::templates_of;
use crate::model::{expand_template_payload, id_of, ActionResult, Fqid, Id, Instance};
use crate::store::Transaction;

type ExecuteFuture<'b> =
    Pin<Box<dyn Future<Output = Result<Vec<ActionResult>, ActionError>> + Send + 'b>>;

/// Everything an action sees while it runs: the request's transaction and
/// the requesting user.
pub struct ActionContext<'a> {
    pub tx: &'a mut Transaction,
    pub user_id: Id,
}

impl<'a> ActionContext<'a> {
    pub fn new(tx: &'a mut Transaction, user_id: Id) -> Self {
        Self { tx, user_id }
    }

    /// Run an action over a list of payloads. Internal runs skip the
    /// permission check.
    pub fn execute(&mut self, kind: ActionKind, data: Vec<Instance>, internal: bool) -> ExecuteFuture<'_> {
        Box::pin(async move {
            let action = kind.action();
            let mut results = Vec::with_capacity(data.len());
            for instance in data {
                action.schema().validate(action.behavior(), &instance)?;
                let result = match action.behavior() {
                    ActionBehavior::Create => self.run_create(action, instance, internal).await?,
                    ActionBehavior::Update | ActionBehavior::Delete => {
                        self.run_existing(action, instance, internal).await?
                    }
                };
                results.push(result);
            }
            log::debug!("{} handled {} payloads", kind, results.len());
            Ok(results)
        })
    }

    /// Run a dependent action on behalf of the current one
    pub async fn execute_other_action(
        &mut self,
        kind: ActionKind,
        data: Vec<Instance>,
    ) -> Result<Vec<ActionResult>, ActionError> {
        self.execute(kind, data, true).await
    }

    /// Ids returned by create actions, in payload order
    pub fn created_ids(results: &[ActionResult]) -> Result<Vec<Id>, ActionError> {
        results
            .iter()
            .map(|result| {
                result
                    .as_ref()
                    .and_then(|value| id_of(value.get("id")))
                    .ok_or_else(|| ActionError::Database("Create action returned no id".to_string()))
            })
            .collect()
    }

    async fn run_create(
        &mut self,
        action: &'static dyn Action,
        mut instance: Instance,
        internal: bool,
    ) -> Result<ActionResult, ActionError> {
        let collection = action.collection();
        let templates = templates_of(collection);
        let id = self.tx.reserve_id(collection).await?;
        let fqid = Fqid::new(collection, id);
        instance.insert("id".to_string(), Value::from(id));
        self.tx
            .stage(fqid, expand_template_payload(instance.clone(), &templates, None));

        if !internal {
            action
                .permission()
                .check(self.tx, self.user_id, collection, &instance)
                .await?;
        }
        let instance = action.validate_fields(self, instance).await?;
        self.tx
            .stage(fqid, expand_template_payload(instance.clone(), &templates, None));

        for dependency in action.dependencies() {
            let data = action.dependent_action_data(&instance, *dependency);
            if !data.is_empty() {
                self.execute(*dependency, data, true).await?;
            }
        }

        let instance = action.update_instance(self, instance).await?;
        let record = expand_template_payload(instance, &templates, None);
        CascadeEngine::create(self.tx, fqid, record).await?;
        Ok(Some(json!({ "id": id })))
    }

    async fn run_existing(
        &mut self,
        action: &'static dyn Action,
        instance: Instance,
        internal: bool,
    ) -> Result<ActionResult, ActionError> {
        let collection = action.collection();
        let id = id_of(instance.get("id"))
            .ok_or_else(|| ActionError::action("data must contain ['id'] properties"))?;
        let fqid = Fqid::new(collection, id);
        if !self.tx.exists(fqid).await? {
            return Err(ActionError::DoesNotExist(fqid));
        }

        if !internal {
            action
                .permission()
                .check(self.tx, self.user_id, collection, &instance)
                .await?;
        }
        let instance = action.validate_fields(self, instance).await?;
        let mut instance = action.update_instance(self, instance).await?;

        match action.behavior() {
            ActionBehavior::Delete => CascadeEngine::delete(self.tx, fqid).await?,
            _ => {
                instance.remove("id");
                let existing = self.tx.get(fqid, &[], true).await?;
                let record =
                    expand_template_payload(instance, &templates_of(collection), Some(&existing));
                if !record.is_empty() {
                    CascadeEngine::update(self.tx, fqid, record).await?;
                }
            }
        }
        Ok(None)
    }
}

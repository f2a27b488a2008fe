use serde_json::Value;

use crate::action::{
    Action, ActionBehavior, ActionContext, ActionKind, ActionSchema,
    AssignmentCandidatePermission, PermissionStrategy,
};
use crate::error::ActionError;
use crate::model::{id_of, Collection, Filter, Fqid, Id, Instance, Record};
use crate::store::Transaction;

const FINISHED: &str = "finished";

async fn assignment(tx: &mut Transaction, assignment_id: Id) -> Result<Record, ActionError> {
    tx.get(
        Fqid::new(Collection::Assignment, assignment_id),
        &["meeting_id", "phase"],
        true,
    )
    .await
}

fn is_finished(assignment: &Record) -> bool {
    assignment.get("phase").and_then(Value::as_str) == Some(FINISHED)
}

/// Nominates a user for an assignment
pub struct AssignmentCandidateCreate;

#[async_trait::async_trait]
impl Action for AssignmentCandidateCreate {
    fn kind(&self) -> ActionKind {
        ActionKind::AssignmentCandidateCreate
    }

    fn collection(&self) -> Collection {
        Collection::AssignmentCandidate
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Create
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(&["assignment_id", "user_id"], &["weight"])
    }

    fn permission(&self) -> &'static dyn PermissionStrategy {
        &AssignmentCandidatePermission
    }

    async fn validate_fields(
        &self,
        ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        let assignment_id = id_of(instance.get("assignment_id")).unwrap_or_default();
        let user_id = id_of(instance.get("user_id")).unwrap_or_default();
        if is_finished(&assignment(ctx.tx, assignment_id).await?) {
            return Err(ActionError::action(
                "It is not permitted to add a candidate to a finished assignment!",
            ));
        }
        let duplicates = ctx
            .tx
            .filter(
                Collection::AssignmentCandidate,
                &Filter::and(vec![
                    Filter::eq("assignment_id", assignment_id),
                    Filter::eq("user_id", user_id),
                ]),
                &["id"],
                true,
            )
            .await?;
        if !duplicates.is_empty() {
            return Err(ActionError::action(format!(
                "User {} is already a candidate of assignment {}",
                user_id, assignment_id
            )));
        }
        Ok(instance)
    }

    async fn update_instance(
        &self,
        ctx: &mut ActionContext<'_>,
        mut instance: Instance,
    ) -> Result<Instance, ActionError> {
        let assignment_id = id_of(instance.get("assignment_id")).unwrap_or_default();
        let assignment = assignment(ctx.tx, assignment_id).await?;
        if let Some(meeting_id) = assignment.get("meeting_id") {
            instance.insert("meeting_id".to_string(), meeting_id.clone());
        }
        Ok(instance)
    }
}

/// Withdraws a candidacy; not possible once the assignment is finished
pub struct AssignmentCandidateDelete;

#[async_trait::async_trait]
impl Action for AssignmentCandidateDelete {
    fn kind(&self) -> ActionKind {
        ActionKind::AssignmentCandidateDelete
    }

    fn collection(&self) -> Collection {
        Collection::AssignmentCandidate
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Delete
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(&[], &[])
    }

    fn permission(&self) -> &'static dyn PermissionStrategy {
        &AssignmentCandidatePermission
    }

    async fn validate_fields(
        &self,
        ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        let id = id_of(instance.get("id")).unwrap_or_default();
        let candidate = ctx
            .tx
            .get(
                Fqid::new(Collection::AssignmentCandidate, id),
                &["assignment_id"],
                true,
            )
            .await?;
        if let Some(assignment_id) = id_of(candidate.get("assignment_id")) {
            if is_finished(&assignment(ctx.tx, assignment_id).await?) {
                return Err(ActionError::action(
                    "It is not permitted to remove a candidate from a finished assignment!",
                ));
            }
        }
        Ok(instance)
    }
}

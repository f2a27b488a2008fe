use serde_json::{json, Value};

use crate::action::{
    Action, ActionBehavior, ActionContext, ActionKind, ActionSchema, MeetingIdFrom,
    MeetingPermission, PermissionStrategy,
};
use crate::error::ActionError;
use crate::model::{Collection, Instance, Permission};

static PERMISSION: MeetingPermission =
    MeetingPermission::new(Permission::MotionCanManage, MeetingIdFrom::Instance("meeting_id"));

fn state(value: Value) -> Instance {
    match value {
        Value::Object(map) => map,
        _ => Instance::new(),
    }
}

/// Creates a workflow with the four standard states: `submitted`, which
/// leads to `accepted`, `rejected` or `not decided`.
pub struct MotionWorkflowCreateSimpleWorkflow;

#[async_trait::async_trait]
impl Action for MotionWorkflowCreateSimpleWorkflow {
    fn kind(&self) -> ActionKind {
        ActionKind::MotionWorkflowCreateSimpleWorkflow
    }

    fn collection(&self) -> Collection {
        Collection::MotionWorkflow
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Create
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(
            &["name", "meeting_id"],
            &[
                "default_workflow_meeting_id",
                "default_amendment_workflow_meeting_id",
                "default_statute_amendment_workflow_meeting_id",
            ],
        )
    }

    fn permission(&self) -> &'static dyn PermissionStrategy {
        &PERMISSION
    }

    async fn update_instance(
        &self,
        ctx: &mut ActionContext<'_>,
        mut instance: Instance,
    ) -> Result<Instance, ActionError> {
        let workflow_id = instance.get("id").cloned().unwrap_or(Value::Null);

        let final_states = vec![
            state(json!({
                "name": "accepted",
                "weight": 2,
                "workflow_id": workflow_id,
                "recommendation_label": "Acceptance",
                "css_class": "green",
                "set_number": true,
                "merge_amendment_into_final": "do_merge",
            })),
            state(json!({
                "name": "rejected",
                "weight": 3,
                "workflow_id": workflow_id,
                "recommendation_label": "Rejection",
                "css_class": "red",
                "set_number": true,
                "merge_amendment_into_final": "do_not_merge",
            })),
            state(json!({
                "name": "not decided",
                "weight": 4,
                "workflow_id": workflow_id,
                "recommendation_label": "No decision",
                "css_class": "grey",
                "set_number": true,
                "merge_amendment_into_final": "do_not_merge",
            })),
        ];
        let results = ctx
            .execute_other_action(ActionKind::MotionStateCreate, final_states)
            .await?;
        let next_state_ids = ActionContext::created_ids(&results)?;

        let submitted = state(json!({
            "name": "submitted",
            "weight": 1,
            "workflow_id": workflow_id,
            "css_class": "lightblue",
            "set_number": true,
            "merge_amendment_into_final": "do_not_merge",
            "allow_support": true,
            "allow_create_poll": true,
            "allow_submitter_edit": true,
            "next_state_ids": next_state_ids,
        }));
        let results = ctx
            .execute_other_action(ActionKind::MotionStateCreate, vec![submitted])
            .await?;
        let first_state_id = ActionContext::created_ids(&results)?;
        if let Some(first_state_id) = first_state_id.first() {
            instance.insert("first_state_id".to_string(), Value::from(*first_state_id));
        }
        Ok(instance)
    }
}

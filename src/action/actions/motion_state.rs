use serde_json::Value;

use crate::action::{
    Action, ActionBehavior, ActionContext, ActionKind, ActionSchema, MeetingIdFrom,
    MeetingPermission, PermissionStrategy,
};
use crate::error::ActionError;
use crate::model::{id_of, Collection, Fqid, Instance, Permission};

static PERMISSION: MeetingPermission = MeetingPermission::new(
    Permission::MotionCanManage,
    MeetingIdFrom::Related {
        field: "workflow_id",
        collection: Collection::MotionWorkflow,
    },
);

/// Creates a state inside a workflow; the meeting is taken from the workflow.
pub struct MotionStateCreate;

#[async_trait::async_trait]
impl Action for MotionStateCreate {
    fn kind(&self) -> ActionKind {
        ActionKind::MotionStateCreate
    }

    fn collection(&self) -> Collection {
        Collection::MotionState
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Create
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(
            &["name", "workflow_id"],
            &[
                "weight",
                "css_class",
                "recommendation_label",
                "set_number",
                "merge_amendment_into_final",
                "allow_support",
                "allow_create_poll",
                "allow_submitter_edit",
                "show_state_extension_field",
                "show_recommendation_extension_field",
                "restrictions",
                "next_state_ids",
                "previous_state_ids",
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
        let workflow_id = id_of(instance.get("workflow_id")).unwrap_or_default();
        let workflow = ctx
            .tx
            .get(
                Fqid::new(Collection::MotionWorkflow, workflow_id),
                &["meeting_id"],
                true,
            )
            .await?;
        let meeting_id = id_of(workflow.get("meeting_id")).ok_or_else(|| {
            ActionError::Database(format!("Workflow {} has no meeting_id", workflow_id))
        })?;
        instance.insert("meeting_id".to_string(), Value::from(meeting_id));
        Ok(instance)
    }
}

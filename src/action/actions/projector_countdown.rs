use serde_json::Value;

use crate::action::{
    Action, ActionBehavior, ActionContext, ActionKind, ActionSchema, MeetingIdFrom,
    MeetingPermission, PermissionStrategy,
};
use crate::error::ActionError;
use crate::model::{id_of, Collection, Filter, Fqid, Instance, Permission};

/// Countdown length in seconds when the meeting configures none
pub const DEFAULT_COUNTDOWN_TIME: u64 = 60;

static PERMISSION: MeetingPermission =
    MeetingPermission::new(Permission::ProjectorCanManage, MeetingIdFrom::Instance("meeting_id"));

pub struct ProjectorCountdownCreate;

#[async_trait::async_trait]
impl Action for ProjectorCountdownCreate {
    fn kind(&self) -> ActionKind {
        ActionKind::ProjectorCountdownCreate
    }

    fn collection(&self) -> Collection {
        Collection::ProjectorCountdown
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Create
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(&["title", "meeting_id"], &["description", "default_time"])
    }

    fn permission(&self) -> &'static dyn PermissionStrategy {
        &PERMISSION
    }

    async fn validate_fields(
        &self,
        ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        let meeting_id = id_of(instance.get("meeting_id")).unwrap_or_default();
        let title = instance.get("title").cloned().unwrap_or(Value::Null);
        let id = id_of(instance.get("id"));
        let existing = ctx
            .tx
            .filter(
                Collection::ProjectorCountdown,
                &Filter::and(vec![
                    Filter::eq("meeting_id", meeting_id),
                    Filter::eq("title", title),
                ]),
                &["id"],
                false,
            )
            .await?;
        if existing.keys().any(|other| Some(*other) != id) {
            return Err(ActionError::action("Title already exists in this meeting."));
        }
        Ok(instance)
    }

    async fn update_instance(
        &self,
        ctx: &mut ActionContext<'_>,
        mut instance: Instance,
    ) -> Result<Instance, ActionError> {
        let default_time = match id_of(instance.get("default_time")) {
            Some(time) => time,
            None => {
                let meeting_id = id_of(instance.get("meeting_id")).unwrap_or_default();
                let meeting = ctx
                    .tx
                    .get(
                        Fqid::new(Collection::Meeting, meeting_id),
                        &["projector_countdown_default_time"],
                        false,
                    )
                    .await?;
                id_of(meeting.get("projector_countdown_default_time"))
                    .unwrap_or(DEFAULT_COUNTDOWN_TIME)
            }
        };
        instance.insert("default_time".to_string(), Value::from(default_time));
        instance.insert("countdown_time".to_string(), Value::from(default_time));
        instance.insert("running".to_string(), Value::Bool(false));
        Ok(instance)
    }
}

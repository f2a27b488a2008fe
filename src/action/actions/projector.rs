use serde_json::Value;

use crate::action::{
    Action, ActionBehavior, ActionContext, ActionKind, ActionSchema, MeetingIdFrom,
    MeetingPermission, PermissionStrategy,
};
use crate::error::ActionError;
use crate::model::relations::USED_AS_DEFAULT;
use crate::model::{Collection, Instance, Permission};

/// Content types a meeting keeps a default projector for
pub const DEFAULT_PROJECTOR_REPLACEMENTS: [&str; 15] = [
    "agenda_all_items",
    "topics",
    "list_of_speakers",
    "current_list_of_speakers",
    "motion",
    "amendment",
    "motion_block",
    "assignment",
    "user",
    "mediafile",
    "projector_message",
    "projector_countdowns",
    "assignment_poll",
    "motion_poll",
    "poll",
];

static PERMISSION: MeetingPermission =
    MeetingPermission::new(Permission::ProjectorCanManage, MeetingIdFrom::Instance("meeting_id"));

pub struct ProjectorCreate;

#[async_trait::async_trait]
impl Action for ProjectorCreate {
    fn kind(&self) -> ActionKind {
        ActionKind::ProjectorCreate
    }

    fn collection(&self) -> Collection {
        Collection::Projector
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Create
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(
            &["name", "meeting_id"],
            &[
                "used_as_reference_projector_meeting_id",
                "used_as_default_$_in_meeting_id",
                "scale",
                "scroll",
                "width",
                "aspect_ratio_numerator",
                "aspect_ratio_denominator",
                "color",
                "background_color",
            ],
        )
    }

    fn permission(&self) -> &'static dyn PermissionStrategy {
        &PERMISSION
    }

    async fn validate_fields(
        &self,
        _ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        match instance.get(&USED_AS_DEFAULT.structure()) {
            None | Some(Value::Null) => {}
            Some(Value::Object(defaults)) => {
                if let Some(unknown) = defaults
                    .keys()
                    .find(|key| !DEFAULT_PROJECTOR_REPLACEMENTS.contains(&key.as_str()))
                {
                    return Err(ActionError::action(format!(
                        "Invalid projector default: {}",
                        unknown
                    )));
                }
            }
            Some(_) => {
                return Err(ActionError::action(
                    "data.used_as_default_$_in_meeting_id must be object",
                ))
            }
        }
        Ok(instance)
    }
}

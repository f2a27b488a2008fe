use serde_json::Value;

use crate::action::{
    Action, ActionBehavior, ActionContext, ActionKind, ActionSchema, MeetingIdFrom,
    MeetingPermission, PermissionStrategy,
};
use crate::error::ActionError;
use crate::model::{strings_of, Collection, Fqid, Instance, Permission};

static CREATE_PERMISSION: MeetingPermission =
    MeetingPermission::new(Permission::UserCanManage, MeetingIdFrom::Instance("meeting_id"));
static MODEL_PERMISSION: MeetingPermission =
    MeetingPermission::new(Permission::UserCanManage, MeetingIdFrom::Model);

fn validate_permissions(instance: &Instance) -> Result<(), ActionError> {
    match instance.get("permissions") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Array(items)) => {
            if items.iter().any(|item| !item.is_string()) {
                return Err(ActionError::action("data.permissions must contain only strings"));
            }
            for permission in strings_of(instance.get("permissions")) {
                permission
                    .parse::<Permission>()
                    .map_err(ActionError::Action)?;
            }
            Ok(())
        }
        Some(_) => Err(ActionError::action("data.permissions must be array")),
    }
}

pub struct GroupCreate;

#[async_trait::async_trait]
impl Action for GroupCreate {
    fn kind(&self) -> ActionKind {
        ActionKind::GroupCreate
    }

    fn collection(&self) -> Collection {
        Collection::Group
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Create
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(&["name", "meeting_id"], &["permissions"])
    }

    fn permission(&self) -> &'static dyn PermissionStrategy {
        &CREATE_PERMISSION
    }

    async fn validate_fields(
        &self,
        _ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        validate_permissions(&instance)?;
        Ok(instance)
    }
}

pub struct GroupUpdate;

#[async_trait::async_trait]
impl Action for GroupUpdate {
    fn kind(&self) -> ActionKind {
        ActionKind::GroupUpdate
    }

    fn collection(&self) -> Collection {
        Collection::Group
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Update
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(&[], &["name", "permissions"])
    }

    fn permission(&self) -> &'static dyn PermissionStrategy {
        &MODEL_PERMISSION
    }

    async fn validate_fields(
        &self,
        _ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        validate_permissions(&instance)?;
        Ok(instance)
    }
}

/// Deleting a group retracts it from its users, meeting and mediafiles.
/// The default and admin groups of a meeting cannot be deleted.
pub struct GroupDelete;

#[async_trait::async_trait]
impl Action for GroupDelete {
    fn kind(&self) -> ActionKind {
        ActionKind::GroupDelete
    }

    fn collection(&self) -> Collection {
        Collection::Group
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Delete
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(&[], &[])
    }

    fn permission(&self) -> &'static dyn PermissionStrategy {
        &MODEL_PERMISSION
    }

    async fn validate_fields(
        &self,
        ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        let id = instance.get("id").and_then(Value::as_u64).unwrap_or_default();
        let group = ctx
            .tx
            .get(
                Fqid::new(Collection::Group, id),
                &["default_group_for_meeting_id", "admin_group_for_meeting_id"],
                true,
            )
            .await?;
        let is_protected = ["default_group_for_meeting_id", "admin_group_for_meeting_id"]
            .iter()
            .any(|field| group.get(*field).is_some_and(|value| !value.is_null()));
        if is_protected {
            return Err(ActionError::action(
                "You cannot delete a group with default_group_for_meeting_id or admin_group_for_meeting_id.",
            ));
        }
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_permissions() {
        let ok = json!({"permissions": ["user.can_see", "motion.can_manage"]});
        assert!(validate_permissions(ok.as_object().unwrap()).is_ok());

        let unknown = json!({"permissions": ["user.can_fly"]});
        let error = validate_permissions(unknown.as_object().unwrap()).unwrap_err();
        assert_eq!(error.to_string(), "Invalid permission: user.can_fly");

        let wrong_type = json!({"permissions": "user.can_see"});
        assert!(validate_permissions(wrong_type.as_object().unwrap()).is_err());
    }
}

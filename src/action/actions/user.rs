use serde_json::Value;

use crate::action::{
    Action, ActionBehavior, ActionContext, ActionKind, ActionSchema, OrganizationManagement,
    PermissionStrategy,
};
use crate::error::ActionError;
use crate::model::relations::{COMMITTEE_MANAGEMENT_LEVEL, GROUP_IDS};
use crate::model::{
    id_of, ids_of, Collection, CommitteeManagementLevel, Fqid, Instance,
    OrganizationManagementLevel,
};

static PERMISSION: OrganizationManagement =
    OrganizationManagement(OrganizationManagementLevel::CanManageUsers);

/// Updates a user's personal data and meeting memberships. Membership is
/// given per meeting as `{"group_$_ids": {"<meeting_id>": [group ids]}}`.
pub struct UserUpdate;

impl UserUpdate {
    async fn validate_groups(
        ctx: &mut ActionContext<'_>,
        instance: &Instance,
    ) -> Result<(), ActionError> {
        let structure = GROUP_IDS.structure();
        let entries = match instance.get(&structure) {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Object(entries)) => entries,
            Some(_) => {
                return Err(ActionError::action(format!("data.{} must be object", structure)))
            }
        };
        for (meeting, group_ids) in entries {
            let meeting_id: u64 = meeting.parse().map_err(|_| {
                ActionError::action(format!("Invalid meeting id in {}: {}", structure, meeting))
            })?;
            match group_ids {
                Value::Null => continue,
                Value::Array(items) if items.iter().all(Value::is_u64) => {}
                _ => {
                    return Err(ActionError::action(format!(
                        "data.{}.{} must be a list of ids",
                        structure, meeting
                    )))
                }
            }
            for group_id in ids_of(Some(group_ids)) {
                let group = ctx
                    .tx
                    .get(Fqid::new(Collection::Group, group_id), &["meeting_id"], true)
                    .await?;
                if id_of(group.get("meeting_id")) != Some(meeting_id) {
                    return Err(ActionError::action(format!(
                        "Group {} does not belong to meeting {}",
                        group_id, meeting_id
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_committee_levels(instance: &Instance) -> Result<(), ActionError> {
        let structure = COMMITTEE_MANAGEMENT_LEVEL.structure();
        let entries = match instance.get(&structure) {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Object(entries)) => entries,
            Some(_) => {
                return Err(ActionError::action(format!("data.{} must be object", structure)))
            }
        };
        let allowed = CommitteeManagementLevel::CanManage.as_str();
        for (level, committee_ids) in entries {
            if level != allowed {
                return Err(ActionError::action(format!(
                    "data.{} must only contain ['{}']",
                    structure, allowed
                )));
            }
            match committee_ids {
                Value::Null => {}
                Value::Array(items) if items.iter().all(Value::is_u64) => {}
                _ => {
                    return Err(ActionError::action(format!(
                        "data.{}.{} must be a list of ids",
                        structure, level
                    )))
                }
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Action for UserUpdate {
    fn kind(&self) -> ActionKind {
        ActionKind::UserUpdate
    }

    fn collection(&self) -> Collection {
        Collection::User
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Update
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(
            &[],
            &[
                "username",
                "first_name",
                "last_name",
                "email",
                "is_active",
                "group_$_ids",
                "committee_$_management_level",
            ],
        )
    }

    fn permission(&self) -> &'static dyn PermissionStrategy {
        &PERMISSION
    }

    async fn validate_fields(
        &self,
        ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        Self::validate_committee_levels(&instance)?;
        Self::validate_groups(ctx, &instance).await?;
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_committee_levels() {
        let ok = json!({"committee_$_management_level": {"can_manage": [1, 2]}});
        assert!(UserUpdate::validate_committee_levels(ok.as_object().unwrap()).is_ok());

        let bad = json!({"committee_$_management_level": {"can_fly": [1]}});
        let error = UserUpdate::validate_committee_levels(bad.as_object().unwrap()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "data.committee_$_management_level must only contain ['can_manage']"
        );

        let wrong_type = json!({"committee_$_management_level": {"can_manage": "1"}});
        assert!(UserUpdate::validate_committee_levels(wrong_type.as_object().unwrap()).is_err());
    }
}

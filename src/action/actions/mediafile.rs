use serde_json::Value;

use crate::action::{
    Action, ActionBehavior, ActionContext, ActionKind, ActionSchema, MeetingIdFrom,
    MeetingPermission, PermissionStrategy,
};
use crate::error::ActionError;
use crate::model::{id_of, ids_of, Collection, Fqid, Instance, Permission};

static CREATE_PERMISSION: MeetingPermission = MeetingPermission::new(
    Permission::MediafileCanManage,
    MeetingIdFrom::Instance("meeting_id"),
);
static MODEL_PERMISSION: MeetingPermission =
    MeetingPermission::new(Permission::MediafileCanManage, MeetingIdFrom::Model);

/// Access groups must belong to the mediafile's meeting
async fn validate_access_groups(
    ctx: &mut ActionContext<'_>,
    instance: &Instance,
    meeting_id: u64,
) -> Result<(), ActionError> {
    for group_id in ids_of(instance.get("access_group_ids")) {
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
    Ok(())
}

/// Creates a directory. `is_public` and `inherited_access_group_ids` are
/// computed from the access groups of the directory and its parents.
pub struct MediafileCreateDirectory;

#[async_trait::async_trait]
impl Action for MediafileCreateDirectory {
    fn kind(&self) -> ActionKind {
        ActionKind::MediafileCreateDirectory
    }

    fn collection(&self) -> Collection {
        Collection::Mediafile
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Create
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(&["meeting_id", "title"], &["access_group_ids", "parent_id"])
    }

    fn permission(&self) -> &'static dyn PermissionStrategy {
        &CREATE_PERMISSION
    }

    async fn validate_fields(
        &self,
        ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        let meeting_id = id_of(instance.get("meeting_id")).unwrap_or_default();
        if let Some(parent_id) = id_of(instance.get("parent_id")) {
            let parent = ctx
                .tx
                .get(
                    Fqid::new(Collection::Mediafile, parent_id),
                    &["meeting_id", "is_directory"],
                    true,
                )
                .await?;
            if parent.get("is_directory").and_then(Value::as_bool) != Some(true) {
                return Err(ActionError::action("Parent is not a directory."));
            }
            if id_of(parent.get("meeting_id")) != Some(meeting_id) {
                return Err(ActionError::action(
                    "Parent must belong to the same meeting.",
                ));
            }
        }
        validate_access_groups(ctx, &instance, meeting_id).await?;
        Ok(instance)
    }

    async fn update_instance(
        &self,
        _ctx: &mut ActionContext<'_>,
        mut instance: Instance,
    ) -> Result<Instance, ActionError> {
        instance.insert("is_directory".to_string(), Value::Bool(true));
        instance.insert(
            "create_timestamp".to_string(),
            Value::from(chrono::Utc::now().timestamp()),
        );
        Ok(instance)
    }
}

pub struct MediafileUpdate;

#[async_trait::async_trait]
impl Action for MediafileUpdate {
    fn kind(&self) -> ActionKind {
        ActionKind::MediafileUpdate
    }

    fn collection(&self) -> Collection {
        Collection::Mediafile
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Update
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(&[], &["title", "access_group_ids"])
    }

    fn permission(&self) -> &'static dyn PermissionStrategy {
        &MODEL_PERMISSION
    }

    async fn validate_fields(
        &self,
        ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        let id = id_of(instance.get("id")).unwrap_or_default();
        let mediafile = ctx
            .tx
            .get(Fqid::new(Collection::Mediafile, id), &["meeting_id"], true)
            .await?;
        let meeting_id = id_of(mediafile.get("meeting_id")).unwrap_or_default();
        validate_access_groups(ctx, &instance, meeting_id).await?;
        Ok(instance)
    }
}

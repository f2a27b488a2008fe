use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

use itertools::Itertools;

use crate::action::actions::projector::DEFAULT_PROJECTOR_REPLACEMENTS;
use crate::action::{
    Action, ActionBehavior, ActionContext, ActionKind, ActionSchema, CommitteeManagement,
    MeetingIdFrom, MeetingPermission, PermissionStrategy,
};
use crate::error::ActionError;
use crate::model::relations::{FONT, LOGO};
use crate::model::{
    id_of, ids_of, Collection, Fqid, Id, Instance, Permission, TemplateField,
    UserContext,
};

fn payload(value: Value) -> Instance {
    match value {
        Value::Object(map) => map,
        _ => Instance::new(),
    }
}

/// The five groups every new meeting starts with. `Default` and `Admin`
/// must stay first and second.
fn default_groups(meeting_id: Id) -> Vec<Instance> {
    vec![
        payload(json!({
            "name": "Default",
            "meeting_id": meeting_id,
            "permissions": [
                "agenda_item.can_see_internal",
                "assignment.can_see",
                "list_of_speakers.can_see",
                "mediafile.can_see",
                "meeting.can_see_frontpage",
                "motion.can_see",
                "projector.can_see",
                "user.can_see",
                "user.can_change_own_password",
            ],
        })),
        payload(json!({
            "name": "Admin",
            "meeting_id": meeting_id,
        })),
        payload(json!({
            "name": "Delegates",
            "meeting_id": meeting_id,
            "permissions": [
                "agenda_item.can_see_internal",
                "assignment.can_nominate_other",
                "assignment.can_nominate_self",
                "list_of_speakers.can_be_speaker",
                "mediafile.can_see",
                "meeting.can_see_autopilot",
                "meeting.can_see_frontpage",
                "motion.can_create",
                "motion.can_create_amendments",
                "motion.can_support",
                "projector.can_see",
                "user.can_see",
                "user.can_change_own_password",
            ],
        })),
        payload(json!({
            "name": "Staff",
            "meeting_id": meeting_id,
            "permissions": [
                "agenda_item.can_manage",
                "assignment.can_manage",
                "assignment.can_nominate_self",
                "list_of_speakers.can_be_speaker",
                "list_of_speakers.can_manage",
                "mediafile.can_manage",
                "meeting.can_see_frontpage",
                "meeting.can_see_history",
                "motion.can_manage",
                "projector.can_manage",
                "tag.can_manage",
                "user.can_manage",
                "user.can_change_own_password",
            ],
        })),
        payload(json!({
            "name": "Committees",
            "meeting_id": meeting_id,
            "permissions": [
                "agenda_item.can_see_internal",
                "assignment.can_see",
                "list_of_speakers.can_see",
                "mediafile.can_see",
                "meeting.can_see_frontpage",
                "motion.can_create",
                "motion.can_create_amendments",
                "motion.can_support",
                "projector.can_see",
                "user.can_see",
            ],
        })),
    ]
}

/// Creates a meeting together with its groups, the simple workflow, the
/// default projector and the two meeting countdowns. The requesting user
/// joins the admin group.
pub struct MeetingCreate;

impl MeetingCreate {
    fn assert_group_name(
        ctx: &ActionContext<'_>,
        group_id: Id,
        expected: &str,
    ) -> Result<(), ActionError> {
        let fqid = Fqid::new(Collection::Group, group_id);
        let name = ctx
            .tx
            .additional_relation_model(&fqid)
            .and_then(|group| group.get("name").and_then(Value::as_str).map(str::to_string));
        if name.as_deref() == Some(expected) {
            Ok(())
        } else {
            Err(ActionError::Database(format!(
                "Group {} should be the {} group of the new meeting",
                group_id, expected
            )))
        }
    }
}

#[async_trait::async_trait]
impl Action for MeetingCreate {
    fn kind(&self) -> ActionKind {
        ActionKind::MeetingCreate
    }

    fn collection(&self) -> Collection {
        Collection::Meeting
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Create
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(
            &["committee_id", "name", "welcome_title"],
            &[
                "welcome_text",
                "description",
                "location",
                "start_time",
                "end_time",
                "url_name",
                "enable_anonymous",
                "guest_ids",
            ],
        )
    }

    fn permission(&self) -> &'static dyn PermissionStrategy {
        &CommitteeManagement
    }

    fn dependencies(&self) -> &'static [ActionKind] {
        &[
            ActionKind::MotionWorkflowCreateSimpleWorkflow,
            ActionKind::ProjectorCreate,
        ]
    }

    fn dependent_action_data(&self, instance: &Instance, kind: ActionKind) -> Vec<Instance> {
        let Some(meeting_id) = id_of(instance.get("id")) else {
            return Vec::new();
        };
        match kind {
            ActionKind::MotionWorkflowCreateSimpleWorkflow => vec![payload(json!({
                "name": "Simple Workflow",
                "default_workflow_meeting_id": meeting_id,
                "default_amendment_workflow_meeting_id": meeting_id,
                "default_statute_amendment_workflow_meeting_id": meeting_id,
                "meeting_id": meeting_id,
            }))],
            ActionKind::ProjectorCreate => {
                let defaults: Map<String, Value> = DEFAULT_PROJECTOR_REPLACEMENTS
                    .iter()
                    .map(|name| (name.to_string(), Value::from(meeting_id)))
                    .collect();
                vec![payload(json!({
                    "name": "Default projector",
                    "meeting_id": meeting_id,
                    "used_as_reference_projector_meeting_id": meeting_id,
                    "used_as_default_$_in_meeting_id": defaults,
                }))]
            }
            _ => Vec::new(),
        }
    }

    async fn validate_fields(
        &self,
        ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        let guest_ids = ids_of(instance.get("guest_ids"));
        if guest_ids.is_empty() {
            return Ok(instance);
        }
        let committee_id = id_of(instance.get("committee_id")).unwrap_or_default();
        let committee = ctx
            .tx
            .get(
                Fqid::new(Collection::Committee, committee_id),
                &["member_ids", "manager_ids"],
                true,
            )
            .await?;
        let allowed: BTreeSet<Id> = ids_of(committee.get("member_ids"))
            .into_iter()
            .chain(ids_of(committee.get("manager_ids")))
            .collect();
        let diff: BTreeSet<Id> = guest_ids
            .into_iter()
            .filter(|id| !allowed.contains(id))
            .collect();
        if !diff.is_empty() {
            return Err(ActionError::action(format!(
                "Guest-ids {{{}}} are not part of committee-member or manager_ids.",
                diff.iter().join(", ")
            )));
        }
        Ok(instance)
    }

    async fn update_instance(
        &self,
        ctx: &mut ActionContext<'_>,
        mut instance: Instance,
    ) -> Result<Instance, ActionError> {
        let meeting_id = id_of(instance.get("id"))
            .ok_or_else(|| ActionError::Database("Meeting has no id".to_string()))?;

        let results = ctx
            .execute_other_action(ActionKind::GroupCreate, default_groups(meeting_id))
            .await?;
        let group_ids = ActionContext::created_ids(&results)?;
        let (default_group_id, admin_group_id) = match group_ids.as_slice() {
            [default, admin, ..] => (*default, *admin),
            _ => {
                return Err(ActionError::Database(
                    "Default groups were not created".to_string(),
                ))
            }
        };
        Self::assert_group_name(ctx, default_group_id, "Default")?;
        Self::assert_group_name(ctx, admin_group_id, "Admin")?;
        instance.insert("default_group_id".to_string(), Value::from(default_group_id));
        instance.insert("admin_group_id".to_string(), Value::from(admin_group_id));

        if ctx.user_id != UserContext::ANONYMOUS_ID {
            let mut group_ids = Map::new();
            group_ids.insert(meeting_id.to_string(), json!([admin_group_id]));
            let data = payload(json!({
                "id": ctx.user_id,
                "group_$_ids": group_ids,
            }));
            ctx.execute_other_action(ActionKind::UserUpdate, vec![data])
                .await?;
        }

        let countdowns = vec![
            payload(json!({"title": "List of speakers countdown", "meeting_id": meeting_id})),
            payload(json!({"title": "Voting countdown", "meeting_id": meeting_id})),
        ];
        let results = ctx
            .execute_other_action(ActionKind::ProjectorCountdownCreate, countdowns)
            .await?;
        let countdown_ids = ActionContext::created_ids(&results)?;
        if let [list_of_speakers, poll, ..] = countdown_ids.as_slice() {
            instance.insert(
                "list_of_speakers_countdown_id".to_string(),
                Value::from(*list_of_speakers),
            );
            instance.insert("poll_countdown_id".to_string(), Value::from(*poll));
        }
        Ok(instance)
    }
}

/// Shared rules of the logo and font setters
struct MediaSlot {
    template: TemplateField,
    places: &'static [&'static str],
    mimetypes: &'static [&'static str],
}

const LOGO_SLOT: MediaSlot = MediaSlot {
    template: LOGO,
    places: &[
        "projector_main",
        "projector_header",
        "web_header",
        "pdf_header_l",
        "pdf_header_r",
        "pdf_footer_l",
        "pdf_footer_r",
        "pdf_ballot_paper",
    ],
    mimetypes: &["image/png", "image/jpeg", "image/gif", "image/svg+xml"],
};

const FONT_SLOT: MediaSlot = MediaSlot {
    template: FONT,
    places: &[
        "regular",
        "italic",
        "bold",
        "bold_italic",
        "monospace",
        "chyron_speaker_name",
        "projector_h1",
        "projector_h2",
    ],
    mimetypes: &[
        "font/ttf",
        "font/woff",
        "application/font-woff",
        "application/font-sfnt",
    ],
};

static LOGOS_AND_FONTS_PERMISSION: MeetingPermission = MeetingPermission::new(
    Permission::MeetingCanManageLogosAndFonts,
    MeetingIdFrom::SelfId,
);

impl MediaSlot {
    async fn validate(
        &self,
        ctx: &mut ActionContext<'_>,
        instance: &Instance,
    ) -> Result<(), ActionError> {
        let place = instance.get("place").and_then(Value::as_str).unwrap_or_default();
        if !self.places.contains(&place) {
            return Err(ActionError::action(format!("Invalid place: {}", place)));
        }
        let meeting_id = id_of(instance.get("id")).unwrap_or_default();
        let mediafile_id = id_of(instance.get("mediafile_id"))
            .ok_or_else(|| ActionError::action("data.mediafile_id must be integer"))?;
        let mediafile = ctx
            .tx
            .get(
                Fqid::new(Collection::Mediafile, mediafile_id),
                &["meeting_id", "is_directory", "mimetype"],
                true,
            )
            .await?;
        if id_of(mediafile.get("meeting_id")) != Some(meeting_id) {
            return Err(ActionError::action(format!(
                "Mediafile {} does not belong to meeting {}",
                mediafile_id, meeting_id
            )));
        }
        if mediafile.get("is_directory").and_then(Value::as_bool) == Some(true) {
            return Err(ActionError::action("Cannot set a directory."));
        }
        let mimetype = mediafile
            .get("mimetype")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !self.mimetypes.contains(&mimetype) {
            return Err(ActionError::action(format!("Invalid mimetype: {}", mimetype)));
        }
        Ok(())
    }

    fn assignment(&self, instance: &Instance) -> Instance {
        let mut slot = Map::new();
        if let (Some(place), Some(mediafile_id)) =
            (instance.get("place"), instance.get("mediafile_id"))
        {
            slot.insert(place.as_str().unwrap_or_default().to_string(), mediafile_id.clone());
        }
        let mut update = Instance::new();
        if let Some(id) = instance.get("id") {
            update.insert("id".to_string(), id.clone());
        }
        update.insert(self.template.structure(), Value::Object(slot));
        update
    }
}

pub struct MeetingSetLogo;

#[async_trait::async_trait]
impl Action for MeetingSetLogo {
    fn kind(&self) -> ActionKind {
        ActionKind::MeetingSetLogo
    }

    fn collection(&self) -> Collection {
        Collection::Meeting
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Update
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(&["mediafile_id", "place"], &[])
    }

    fn permission(&self) -> &'static dyn PermissionStrategy {
        &LOGOS_AND_FONTS_PERMISSION
    }

    async fn validate_fields(
        &self,
        ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        LOGO_SLOT.validate(ctx, &instance).await?;
        Ok(instance)
    }

    async fn update_instance(
        &self,
        _ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        Ok(LOGO_SLOT.assignment(&instance))
    }
}

pub struct MeetingSetFont;

#[async_trait::async_trait]
impl Action for MeetingSetFont {
    fn kind(&self) -> ActionKind {
        ActionKind::MeetingSetFont
    }

    fn collection(&self) -> Collection {
        Collection::Meeting
    }

    fn behavior(&self) -> ActionBehavior {
        ActionBehavior::Update
    }

    fn schema(&self) -> ActionSchema {
        ActionSchema::new(&["mediafile_id", "place"], &[])
    }

    fn permission(&self) -> &'static dyn PermissionStrategy {
        &LOGOS_AND_FONTS_PERMISSION
    }

    async fn validate_fields(
        &self,
        ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        FONT_SLOT.validate(ctx, &instance).await?;
        Ok(instance)
    }

    async fn update_instance(
        &self,
        _ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        Ok(FONT_SLOT.assignment(&instance))
    }
}

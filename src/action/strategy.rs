use crate::error::{ActionError, MissingPermission};
use crate::logic::PermissionEngine;
use crate::model::{
    id_of, Collection, CommitteeManagementLevel, Fqid, Id, Instance, OrganizationManagementLevel,
    Permission,
};
use crate::store::Transaction;

/// Decides whether a user may run an action on one payload.
/// Internal sub-actions skip this check.
#[async_trait::async_trait]
pub trait PermissionStrategy: Send + Sync {
    async fn check(
        &self,
        tx: &mut Transaction,
        user_id: Id,
        collection: Collection,
        instance: &Instance,
    ) -> Result<(), ActionError>;
}

/// Where the meeting a payload belongs to is found
#[derive(Debug, Clone, Copy)]
pub enum MeetingIdFrom {
    /// A field of the payload
    Instance(&'static str),
    /// `meeting_id` of the model named by a payload field
    Related {
        field: &'static str,
        collection: Collection,
    },
    /// `meeting_id` of the existing model the payload targets
    Model,
    /// The payload targets the meeting itself
    SelfId,
}

impl MeetingIdFrom {
    pub async fn resolve(
        &self,
        tx: &mut Transaction,
        collection: Collection,
        instance: &Instance,
    ) -> Result<Id, ActionError> {
        let meeting_id = match self {
            MeetingIdFrom::Instance(field) => id_of(instance.get(*field)),
            MeetingIdFrom::SelfId => id_of(instance.get("id")),
            MeetingIdFrom::Model => match id_of(instance.get("id")) {
                Some(id) => {
                    let model = tx
                        .get(Fqid::new(collection, id), &["meeting_id"], false)
                        .await?;
                    id_of(model.get("meeting_id"))
                }
                None => None,
            },
            MeetingIdFrom::Related { field, collection } => match id_of(instance.get(*field)) {
                Some(id) => {
                    let model = tx
                        .get(Fqid::new(*collection, id), &["meeting_id"], false)
                        .await?;
                    id_of(model.get("meeting_id"))
                }
                None => None,
            },
        };
        meeting_id.ok_or_else(|| {
            ActionError::action(format!("Could not determine the meeting of this {}", collection))
        })
    }
}

/// Requires a meeting permission in the payload's meeting
#[derive(Debug, Clone, Copy)]
pub struct MeetingPermission {
    pub permission: Permission,
    pub source: MeetingIdFrom,
}

impl MeetingPermission {
    pub const fn new(permission: Permission, source: MeetingIdFrom) -> Self {
        Self { permission, source }
    }
}

#[async_trait::async_trait]
impl PermissionStrategy for MeetingPermission {
    async fn check(
        &self,
        tx: &mut Transaction,
        user_id: Id,
        collection: Collection,
        instance: &Instance,
    ) -> Result<(), ActionError> {
        let meeting_id = self.source.resolve(tx, collection, instance).await?;
        PermissionEngine::assert_perm(tx, user_id, self.permission, meeting_id).await
    }
}

/// `can_manage` in the committee named by `committee_id`, or organization
/// management rights
#[derive(Debug, Clone, Copy)]
pub struct CommitteeManagement;

#[async_trait::async_trait]
impl PermissionStrategy for CommitteeManagement {
    async fn check(
        &self,
        tx: &mut Transaction,
        user_id: Id,
        _collection: Collection,
        instance: &Instance,
    ) -> Result<(), ActionError> {
        if PermissionEngine::has_organization_management_level(
            tx,
            user_id,
            OrganizationManagementLevel::CanManageOrganization,
        )
        .await?
        {
            return Ok(());
        }
        let committee_id = id_of(instance.get("committee_id"))
            .ok_or_else(|| ActionError::action("data must contain ['committee_id'] properties"))?;
        if PermissionEngine::has_committee_management_level(tx, user_id, committee_id).await? {
            Ok(())
        } else {
            Err(MissingPermission::CommitteeLevel {
                level: CommitteeManagementLevel::CanManage,
                committee_id,
            }
            .into())
        }
    }
}

/// Requires an organization management level
#[derive(Debug, Clone, Copy)]
pub struct OrganizationManagement(pub OrganizationManagementLevel);

#[async_trait::async_trait]
impl PermissionStrategy for OrganizationManagement {
    async fn check(
        &self,
        tx: &mut Transaction,
        user_id: Id,
        _collection: Collection,
        _instance: &Instance,
    ) -> Result<(), ActionError> {
        if PermissionEngine::has_organization_management_level(tx, user_id, self.0).await? {
            Ok(())
        } else {
            Err(MissingPermission::OrganizationLevel(self.0).into())
        }
    }
}

/// Candidacy rules: a voting assignment needs `assignment.can_manage`,
/// nominating oneself needs `can_nominate_self`, anyone else
/// `can_nominate_other`.
#[derive(Debug, Clone, Copy)]
pub struct AssignmentCandidatePermission;

#[async_trait::async_trait]
impl PermissionStrategy for AssignmentCandidatePermission {
    async fn check(
        &self,
        tx: &mut Transaction,
        user_id: Id,
        _collection: Collection,
        instance: &Instance,
    ) -> Result<(), ActionError> {
        let (candidate_user_id, assignment_id) = if instance.contains_key("user_id") {
            (id_of(instance.get("user_id")), id_of(instance.get("assignment_id")))
        } else {
            let id = id_of(instance.get("id"))
                .ok_or_else(|| ActionError::action("data must contain ['id'] properties"))?;
            let candidate = tx
                .get(
                    Fqid::new(Collection::AssignmentCandidate, id),
                    &["user_id", "assignment_id"],
                    false,
                )
                .await?;
            (id_of(candidate.get("user_id")), id_of(candidate.get("assignment_id")))
        };
        let assignment_id = assignment_id
            .ok_or_else(|| ActionError::action("data must contain ['assignment_id'] properties"))?;
        let assignment = tx
            .get(
                Fqid::new(Collection::Assignment, assignment_id),
                &["meeting_id", "phase"],
                false,
            )
            .await?;
        let meeting_id = id_of(assignment.get("meeting_id")).ok_or_else(|| {
            ActionError::Database(format!("Assignment {} has no meeting_id", assignment_id))
        })?;

        if assignment.get("phase").and_then(|phase| phase.as_str()) == Some("voting") {
            PermissionEngine::assert_perm(tx, user_id, Permission::AssignmentCanManage, meeting_id)
                .await?;
        }

        let permission = if candidate_user_id == Some(user_id) {
            Permission::AssignmentCanNominateSelf
        } else {
            Permission::AssignmentCanNominateOther
        };
        PermissionEngine::assert_perm(tx, user_id, permission, meeting_id).await
    }
}

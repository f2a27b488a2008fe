use serde_json::Value;

use crate::error::{ActionError, MissingPermission};
use crate::model::relations::{COMMITTEE_MANAGEMENT_LEVEL, GROUP_IDS};
use crate::model::{
    id_of, ids_of, strings_of, Collection, CommitteeManagementLevel, Fqid, Id,
    OrganizationManagementLevel, Permission, Record, UserContext, UserScope,
};
use crate::store::Transaction;

/// Resolves what a user may do at organization, committee and meeting scope.
///
/// All reads here are unlocked: a permission check must never make the
/// following write fail because some unrelated field of the user changed.
pub struct PermissionEngine;

impl PermissionEngine {
    pub fn organization_level(user: &Record) -> Option<OrganizationManagementLevel> {
        user.get("organization_management_level")
            .and_then(Value::as_str)
            .and_then(|level| level.parse().ok())
    }

    /// Committees the user holds `can_manage` in
    pub fn managed_committees(user: &Record) -> Vec<Id> {
        ids_of(user.get(&COMMITTEE_MANAGEMENT_LEVEL.concrete(
            CommitteeManagementLevel::CanManage.as_str(),
        )))
    }

    pub async fn has_organization_management_level(
        tx: &mut Transaction,
        user_id: Id,
        level: OrganizationManagementLevel,
    ) -> Result<bool, ActionError> {
        if user_id == UserContext::ANONYMOUS_ID {
            return Ok(false);
        }
        let user = tx
            .get(
                Fqid::new(Collection::User, user_id),
                &["organization_management_level"],
                false,
            )
            .await?;
        Ok(Self::organization_level(&user).is_some_and(|own| own.includes(level)))
    }

    pub async fn has_committee_management_level(
        tx: &mut Transaction,
        user_id: Id,
        committee_id: Id,
    ) -> Result<bool, ActionError> {
        if user_id == UserContext::ANONYMOUS_ID {
            return Ok(false);
        }
        let user = tx
            .get(Fqid::new(Collection::User, user_id), &[], false)
            .await?;
        Ok(Self::managed_committees(&user).contains(&committee_id))
    }

    /// Whether the user holds `permission` in the meeting
    pub async fn has_perm(
        tx: &mut Transaction,
        user_id: Id,
        permission: Permission,
        meeting_id: Id,
    ) -> Result<bool, ActionError> {
        let meeting_fqid = Fqid::new(Collection::Meeting, meeting_id);

        if user_id == UserContext::ANONYMOUS_ID {
            let meeting = tx
                .get(meeting_fqid, &["enable_anonymous", "default_group_id"], false)
                .await?;
            let enabled = meeting
                .get("enable_anonymous")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !enabled {
                return Ok(false);
            }
            let group_ids = ids_of(meeting.get("default_group_id"));
            return Self::groups_grant(tx, &group_ids, permission, meeting_id).await;
        }

        let user = tx
            .get(Fqid::new(Collection::User, user_id), &[], false)
            .await?;
        if Self::organization_level(&user) == Some(OrganizationManagementLevel::Superadmin) {
            return Ok(true);
        }

        let group_ids = ids_of(user.get(&GROUP_IDS.concrete(&meeting_id.to_string())));
        if Self::groups_grant(tx, &group_ids, permission, meeting_id).await? {
            return Ok(true);
        }

        let managed = Self::managed_committees(&user);
        if managed.is_empty() {
            return Ok(false);
        }
        let meeting = tx.get(meeting_fqid, &["committee_id"], false).await?;
        let Some(committee_id) = id_of(meeting.get("committee_id")) else {
            return Err(ActionError::Database(format!(
                "Meeting {} has no valid committee_id!",
                meeting_id
            )));
        };
        Ok(managed.contains(&committee_id))
    }

    async fn groups_grant(
        tx: &mut Transaction,
        group_ids: &[Id],
        permission: Permission,
        meeting_id: Id,
    ) -> Result<bool, ActionError> {
        if group_ids.is_empty() {
            return Ok(false);
        }
        let fqids: Vec<Fqid> = group_ids
            .iter()
            .map(|id| Fqid::new(Collection::Group, *id))
            .collect();
        let groups = tx
            .get_many(&fqids, &["admin_group_for_meeting_id", "permissions"], false)
            .await?;
        Ok(groups.values().any(|group| {
            id_of(group.get("admin_group_for_meeting_id")) == Some(meeting_id)
                || strings_of(group.get("permissions"))
                    .iter()
                    .filter_map(|granted| granted.parse::<Permission>().ok())
                    .any(|granted| granted.implies(permission))
        }))
    }

    /// `has_perm`, raising `MissingPermission` when it is not granted
    pub async fn assert_perm(
        tx: &mut Transaction,
        user_id: Id,
        permission: Permission,
        meeting_id: Id,
    ) -> Result<(), ActionError> {
        if Self::has_perm(tx, user_id, permission, meeting_id).await? {
            Ok(())
        } else {
            Err(MissingPermission::Permission {
                permission,
                meeting_id,
            }
            .into())
        }
    }

    /// Check `permission` at the given scope. Organization `can_manage_users`
    /// passes every scope.
    pub async fn check_scope(
        tx: &mut Transaction,
        user_id: Id,
        scope: UserScope,
        scope_id: Id,
        permission: Permission,
    ) -> Result<(), ActionError> {
        if Self::has_organization_management_level(
            tx,
            user_id,
            OrganizationManagementLevel::CanManageUsers,
        )
        .await?
        {
            return Ok(());
        }
        match scope {
            UserScope::Organization => Err(MissingPermission::OrganizationLevel(
                OrganizationManagementLevel::CanManageUsers,
            )
            .into()),
            UserScope::Committee => {
                if Self::has_committee_management_level(tx, user_id, scope_id).await? {
                    Ok(())
                } else {
                    Err(MissingPermission::CommitteeLevel {
                        level: CommitteeManagementLevel::CanManage,
                        committee_id: scope_id,
                    }
                    .into())
                }
            }
            UserScope::Meeting => Self::assert_perm(tx, user_id, permission, scope_id).await,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Meeting-scoped permissions carried by groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "agenda_item.can_see")]
    AgendaItemCanSee,
    #[serde(rename = "agenda_item.can_see_internal")]
    AgendaItemCanSeeInternal,
    #[serde(rename = "agenda_item.can_manage")]
    AgendaItemCanManage,
    #[serde(rename = "assignment.can_see")]
    AssignmentCanSee,
    #[serde(rename = "assignment.can_nominate_other")]
    AssignmentCanNominateOther,
    #[serde(rename = "assignment.can_nominate_self")]
    AssignmentCanNominateSelf,
    #[serde(rename = "assignment.can_manage")]
    AssignmentCanManage,
    #[serde(rename = "list_of_speakers.can_see")]
    ListOfSpeakersCanSee,
    #[serde(rename = "list_of_speakers.can_be_speaker")]
    ListOfSpeakersCanBeSpeaker,
    #[serde(rename = "list_of_speakers.can_manage")]
    ListOfSpeakersCanManage,
    #[serde(rename = "mediafile.can_see")]
    MediafileCanSee,
    #[serde(rename = "mediafile.can_manage")]
    MediafileCanManage,
    #[serde(rename = "meeting.can_see_frontpage")]
    MeetingCanSeeFrontpage,
    #[serde(rename = "meeting.can_see_autopilot")]
    MeetingCanSeeAutopilot,
    #[serde(rename = "meeting.can_see_history")]
    MeetingCanSeeHistory,
    #[serde(rename = "meeting.can_manage_settings")]
    MeetingCanManageSettings,
    #[serde(rename = "meeting.can_manage_logos_and_fonts")]
    MeetingCanManageLogosAndFonts,
    #[serde(rename = "motion.can_see")]
    MotionCanSee,
    #[serde(rename = "motion.can_create")]
    MotionCanCreate,
    #[serde(rename = "motion.can_create_amendments")]
    MotionCanCreateAmendments,
    #[serde(rename = "motion.can_support")]
    MotionCanSupport,
    #[serde(rename = "motion.can_manage")]
    MotionCanManage,
    #[serde(rename = "projector.can_see")]
    ProjectorCanSee,
    #[serde(rename = "projector.can_manage")]
    ProjectorCanManage,
    #[serde(rename = "tag.can_manage")]
    TagCanManage,
    #[serde(rename = "user.can_see")]
    UserCanSee,
    #[serde(rename = "user.can_see_extra_data")]
    UserCanSeeExtraData,
    #[serde(rename = "user.can_manage")]
    UserCanManage,
    #[serde(rename = "user.can_change_own_password")]
    UserCanChangeOwnPassword,
}

impl Permission {
    pub const ALL: [Permission; 29] = [
        Permission::AgendaItemCanSee,
        Permission::AgendaItemCanSeeInternal,
        Permission::AgendaItemCanManage,
        Permission::AssignmentCanSee,
        Permission::AssignmentCanNominateOther,
        Permission::AssignmentCanNominateSelf,
        Permission::AssignmentCanManage,
        Permission::ListOfSpeakersCanSee,
        Permission::ListOfSpeakersCanBeSpeaker,
        Permission::ListOfSpeakersCanManage,
        Permission::MediafileCanSee,
        Permission::MediafileCanManage,
        Permission::MeetingCanSeeFrontpage,
        Permission::MeetingCanSeeAutopilot,
        Permission::MeetingCanSeeHistory,
        Permission::MeetingCanManageSettings,
        Permission::MeetingCanManageLogosAndFonts,
        Permission::MotionCanSee,
        Permission::MotionCanCreate,
        Permission::MotionCanCreateAmendments,
        Permission::MotionCanSupport,
        Permission::MotionCanManage,
        Permission::ProjectorCanSee,
        Permission::ProjectorCanManage,
        Permission::TagCanManage,
        Permission::UserCanSee,
        Permission::UserCanSeeExtraData,
        Permission::UserCanManage,
        Permission::UserCanChangeOwnPassword,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::AgendaItemCanSee => "agenda_item.can_see",
            Permission::AgendaItemCanSeeInternal => "agenda_item.can_see_internal",
            Permission::AgendaItemCanManage => "agenda_item.can_manage",
            Permission::AssignmentCanSee => "assignment.can_see",
            Permission::AssignmentCanNominateOther => "assignment.can_nominate_other",
            Permission::AssignmentCanNominateSelf => "assignment.can_nominate_self",
            Permission::AssignmentCanManage => "assignment.can_manage",
            Permission::ListOfSpeakersCanSee => "list_of_speakers.can_see",
            Permission::ListOfSpeakersCanBeSpeaker => "list_of_speakers.can_be_speaker",
            Permission::ListOfSpeakersCanManage => "list_of_speakers.can_manage",
            Permission::MediafileCanSee => "mediafile.can_see",
            Permission::MediafileCanManage => "mediafile.can_manage",
            Permission::MeetingCanSeeFrontpage => "meeting.can_see_frontpage",
            Permission::MeetingCanSeeAutopilot => "meeting.can_see_autopilot",
            Permission::MeetingCanSeeHistory => "meeting.can_see_history",
            Permission::MeetingCanManageSettings => "meeting.can_manage_settings",
            Permission::MeetingCanManageLogosAndFonts => "meeting.can_manage_logos_and_fonts",
            Permission::MotionCanSee => "motion.can_see",
            Permission::MotionCanCreate => "motion.can_create",
            Permission::MotionCanCreateAmendments => "motion.can_create_amendments",
            Permission::MotionCanSupport => "motion.can_support",
            Permission::MotionCanManage => "motion.can_manage",
            Permission::ProjectorCanSee => "projector.can_see",
            Permission::ProjectorCanManage => "projector.can_manage",
            Permission::TagCanManage => "tag.can_manage",
            Permission::UserCanSee => "user.can_see",
            Permission::UserCanSeeExtraData => "user.can_see_extra_data",
            Permission::UserCanManage => "user.can_manage",
            Permission::UserCanChangeOwnPassword => "user.can_change_own_password",
        }
    }

    /// Permissions directly granted by holding this one
    fn children(&self) -> &'static [Permission] {
        use Permission::*;
        match self {
            AgendaItemCanManage => &[AgendaItemCanSeeInternal],
            AgendaItemCanSeeInternal => &[AgendaItemCanSee],
            AssignmentCanManage => &[AssignmentCanNominateOther],
            AssignmentCanNominateOther => &[AssignmentCanSee],
            AssignmentCanNominateSelf => &[AssignmentCanSee],
            ListOfSpeakersCanManage => &[ListOfSpeakersCanSee],
            ListOfSpeakersCanBeSpeaker => &[ListOfSpeakersCanSee],
            MediafileCanManage => &[MediafileCanSee],
            MeetingCanSeeAutopilot => &[MeetingCanSeeFrontpage],
            MotionCanManage => &[
                MotionCanCreate,
                MotionCanCreateAmendments,
                MotionCanSupport,
            ],
            MotionCanCreate => &[MotionCanSee],
            MotionCanCreateAmendments => &[MotionCanSee],
            MotionCanSupport => &[MotionCanSee],
            ProjectorCanManage => &[ProjectorCanSee],
            UserCanManage => &[UserCanSeeExtraData],
            UserCanSeeExtraData => &[UserCanSee],
            _ => &[],
        }
    }

    /// Whether holding `self` grants `other`
    pub fn implies(&self, other: Permission) -> bool {
        if *self == other {
            return true;
        }
        // The hierarchy is a shallow DAG, an explicit stack is enough.
        let mut stack: Vec<Permission> = self.children().to_vec();
        while let Some(permission) = stack.pop() {
            if permission == other {
                return true;
            }
            stack.extend_from_slice(permission.children());
        }
        false
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|permission| permission.as_str() == s)
            .ok_or_else(|| format!("Invalid permission: {}", s))
    }
}

/// Organization-wide management level, ordered from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationManagementLevel {
    CanManageUsers,
    CanManageOrganization,
    Superadmin,
}

impl OrganizationManagementLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationManagementLevel::CanManageUsers => "can_manage_users",
            OrganizationManagementLevel::CanManageOrganization => "can_manage_organization",
            OrganizationManagementLevel::Superadmin => "superadmin",
        }
    }

    /// Higher levels include all lower ones
    pub fn includes(&self, required: OrganizationManagementLevel) -> bool {
        *self >= required
    }
}

impl fmt::Display for OrganizationManagementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrganizationManagementLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "can_manage_users" => Ok(OrganizationManagementLevel::CanManageUsers),
            "can_manage_organization" => Ok(OrganizationManagementLevel::CanManageOrganization),
            "superadmin" => Ok(OrganizationManagementLevel::Superadmin),
            other => Err(format!("Invalid organization management level: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitteeManagementLevel {
    CanManage,
}

impl CommitteeManagementLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitteeManagementLevel::CanManage => "can_manage",
        }
    }
}

impl fmt::Display for CommitteeManagementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The level a permission check is resolved at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserScope {
    Meeting,
    Committee,
    Organization,
}

impl UserScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserScope::Meeting => "meeting",
            UserScope::Committee => "committee",
            UserScope::Organization => "organization",
        }
    }
}

impl FromStr for UserScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meeting" => Ok(UserScope::Meeting),
            "committee" => Ok(UserScope::Committee),
            "organization" => Ok(UserScope::Organization),
            _ => Err(
                "data.permission_type must be one of ['meeting', 'committee', 'organization']"
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manage_implies_lower_permissions() {
        assert!(Permission::UserCanManage.implies(Permission::UserCanSee));
        assert!(Permission::AssignmentCanManage.implies(Permission::AssignmentCanNominateOther));
        assert!(Permission::MotionCanManage.implies(Permission::MotionCanSee));
        assert!(!Permission::UserCanSee.implies(Permission::UserCanManage));
        assert!(!Permission::AssignmentCanNominateSelf.implies(Permission::AssignmentCanNominateOther));
    }

    #[test]
    fn test_permission_string_round_trip() {
        for permission in Permission::ALL {
            assert_eq!(permission.as_str().parse::<Permission>(), Ok(permission));
            let json = serde_json::to_value(permission).unwrap();
            assert_eq!(json, serde_json::Value::from(permission.as_str()));
        }
        assert!("user.can_fly".parse::<Permission>().is_err());
    }

    #[test]
    fn test_organization_levels_are_ordered() {
        use OrganizationManagementLevel::*;
        assert!(Superadmin.includes(CanManageUsers));
        assert!(CanManageOrganization.includes(CanManageUsers));
        assert!(!CanManageUsers.includes(CanManageOrganization));
    }
}

use std::fmt;
use std::str::FromStr;

use crate::action::actions::{
    assignment_candidate::{AssignmentCandidateCreate, AssignmentCandidateDelete},
    group::{GroupCreate, GroupDelete, GroupUpdate},
    mediafile::{MediafileCreateDirectory, MediafileUpdate},
    meeting::{MeetingCreate, MeetingSetFont, MeetingSetLogo},
    motion_state::MotionStateCreate,
    motion_workflow::MotionWorkflowCreateSimpleWorkflow,
    projector::ProjectorCreate,
    projector_countdown::ProjectorCountdownCreate,
    user::UserUpdate,
};
use crate::action::Action;
use crate::error::ActionError;

/// Every action the handler can dispatch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    AssignmentCandidateCreate,
    AssignmentCandidateDelete,
    GroupCreate,
    GroupUpdate,
    GroupDelete,
    MediafileCreateDirectory,
    MediafileUpdate,
    MeetingCreate,
    MeetingSetLogo,
    MeetingSetFont,
    MotionStateCreate,
    MotionWorkflowCreateSimpleWorkflow,
    ProjectorCreate,
    ProjectorCountdownCreate,
    UserUpdate,
}

impl ActionKind {
    pub const ALL: [ActionKind; 15] = [
        ActionKind::AssignmentCandidateCreate,
        ActionKind::AssignmentCandidateDelete,
        ActionKind::GroupCreate,
        ActionKind::GroupUpdate,
        ActionKind::GroupDelete,
        ActionKind::MediafileCreateDirectory,
        ActionKind::MediafileUpdate,
        ActionKind::MeetingCreate,
        ActionKind::MeetingSetLogo,
        ActionKind::MeetingSetFont,
        ActionKind::MotionStateCreate,
        ActionKind::MotionWorkflowCreateSimpleWorkflow,
        ActionKind::ProjectorCreate,
        ActionKind::ProjectorCountdownCreate,
        ActionKind::UserUpdate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::AssignmentCandidateCreate => "assignment_candidate.create",
            ActionKind::AssignmentCandidateDelete => "assignment_candidate.delete",
            ActionKind::GroupCreate => "group.create",
            ActionKind::GroupUpdate => "group.update",
            ActionKind::GroupDelete => "group.delete",
            ActionKind::MediafileCreateDirectory => "mediafile.create_directory",
            ActionKind::MediafileUpdate => "mediafile.update",
            ActionKind::MeetingCreate => "meeting.create",
            ActionKind::MeetingSetLogo => "meeting.set_logo",
            ActionKind::MeetingSetFont => "meeting.set_font",
            ActionKind::MotionStateCreate => "motion_state.create",
            ActionKind::MotionWorkflowCreateSimpleWorkflow => {
                "motion_workflow.create_simple_workflow"
            }
            ActionKind::ProjectorCreate => "projector.create",
            ActionKind::ProjectorCountdownCreate => "projector_countdown.create",
            ActionKind::UserUpdate => "user.update",
        }
    }

    pub fn action(&self) -> &'static dyn Action {
        match self {
            ActionKind::AssignmentCandidateCreate => &AssignmentCandidateCreate,
            ActionKind::AssignmentCandidateDelete => &AssignmentCandidateDelete,
            ActionKind::GroupCreate => &GroupCreate,
            ActionKind::GroupUpdate => &GroupUpdate,
            ActionKind::GroupDelete => &GroupDelete,
            ActionKind::MediafileCreateDirectory => &MediafileCreateDirectory,
            ActionKind::MediafileUpdate => &MediafileUpdate,
            ActionKind::MeetingCreate => &MeetingCreate,
            ActionKind::MeetingSetLogo => &MeetingSetLogo,
            ActionKind::MeetingSetFont => &MeetingSetFont,
            ActionKind::MotionStateCreate => &MotionStateCreate,
            ActionKind::MotionWorkflowCreateSimpleWorkflow => &MotionWorkflowCreateSimpleWorkflow,
            ActionKind::ProjectorCreate => &ProjectorCreate,
            ActionKind::ProjectorCountdownCreate => &ProjectorCountdownCreate,
            ActionKind::UserUpdate => &UserUpdate,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActionKind {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ActionError::action(format!("Action {} does not exist.", s)))
    }
}

use crate::model::{Collection, TemplateField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationField {
    Plain(&'static str),
    Template(TemplateField),
}

impl RelationField {
    pub fn template(&self) -> Option<&TemplateField> {
        match self {
            RelationField::Template(template) => Some(template),
            RelationField::Plain(_) => None,
        }
    }
}

/// How the replacement of a template reverse field is found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    /// The reverse field is a plain field
    None,
    /// Read from a field of the source record (`group.meeting_id`)
    FromField(&'static str),
    /// Both sides are templates sharing the same key
    SameKey,
}

/// One direction of a relation between two collections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub collection: Collection,
    pub field: RelationField,
    pub cardinality: Cardinality,
    pub target: Collection,
    pub reverse: RelationField,
    pub reverse_cardinality: Cardinality,
    pub replacement: Replacement,
}

impl Relation {
    /// The same relation seen from the target's side
    pub fn flipped(&self) -> Relation {
        Relation {
            collection: self.target,
            field: self.reverse,
            cardinality: self.reverse_cardinality,
            target: self.collection,
            reverse: self.field,
            reverse_cardinality: self.cardinality,
            replacement: match self.replacement {
                Replacement::SameKey => Replacement::SameKey,
                Replacement::FromField(_) | Replacement::None => Replacement::None,
            },
        }
    }
}

use Cardinality::{Many, One};
use Collection as C;

const fn plain(name: &'static str) -> RelationField {
    RelationField::Plain(name)
}

const fn rel(
    collection: Collection,
    field: RelationField,
    cardinality: Cardinality,
    target: Collection,
    reverse: RelationField,
    reverse_cardinality: Cardinality,
) -> Relation {
    Relation {
        collection,
        field,
        cardinality,
        target,
        reverse,
        reverse_cardinality,
        replacement: Replacement::None,
    }
}

const fn with_replacement(relation: Relation, replacement: Replacement) -> Relation {
    Relation {
        replacement,
        ..relation
    }
}

pub const GROUP_IDS: TemplateField = TemplateField::new("group_$", "_ids");
pub const COMMITTEE_MANAGEMENT_LEVEL: TemplateField =
    TemplateField::new("committee_$", "_management_level");
pub const DEFAULT_PROJECTOR: TemplateField = TemplateField::new("default_projector_$", "_id");
pub const USED_AS_DEFAULT: TemplateField =
    TemplateField::new("used_as_default_$", "_in_meeting_id");
pub const LOGO: TemplateField = TemplateField::new("logo_$", "_id");
pub const FONT: TemplateField = TemplateField::new("font_$", "_id");
pub const USED_AS_LOGO: TemplateField = TemplateField::new("used_as_logo_$", "_in_meeting_id");
pub const USED_AS_FONT: TemplateField = TemplateField::new("used_as_font_$", "_in_meeting_id");

/// Each relation is declared once; both directions are derived from it.
const DECLARATIONS: &[Relation] = &[
    rel(C::Committee, plain("meeting_ids"), Many, C::Meeting, plain("committee_id"), One),
    rel(C::Committee, plain("user_ids"), Many, C::User, plain("committee_ids"), Many),
    rel(C::Meeting, plain("guest_ids"), Many, C::User, plain("guest_meeting_ids"), Many),
    rel(C::Meeting, plain("group_ids"), Many, C::Group, plain("meeting_id"), One),
    rel(C::Meeting, plain("user_ids"), Many, C::User, plain("meeting_ids"), Many),
    rel(
        C::Meeting,
        plain("default_group_id"),
        One,
        C::Group,
        plain("default_group_for_meeting_id"),
        One,
    ),
    rel(
        C::Meeting,
        plain("admin_group_id"),
        One,
        C::Group,
        plain("admin_group_for_meeting_id"),
        One,
    ),
    rel(
        C::Meeting,
        plain("motion_workflow_ids"),
        Many,
        C::MotionWorkflow,
        plain("meeting_id"),
        One,
    ),
    rel(C::Meeting, plain("motion_state_ids"), Many, C::MotionState, plain("meeting_id"), One),
    rel(
        C::Meeting,
        plain("motions_default_workflow_id"),
        One,
        C::MotionWorkflow,
        plain("default_workflow_meeting_id"),
        One,
    ),
    rel(
        C::Meeting,
        plain("motions_default_amendment_workflow_id"),
        One,
        C::MotionWorkflow,
        plain("default_amendment_workflow_meeting_id"),
        One,
    ),
    rel(
        C::Meeting,
        plain("motions_default_statute_amendment_workflow_id"),
        One,
        C::MotionWorkflow,
        plain("default_statute_amendment_workflow_meeting_id"),
        One,
    ),
    rel(C::Meeting, plain("projector_ids"), Many, C::Projector, plain("meeting_id"), One),
    rel(
        C::Meeting,
        plain("reference_projector_id"),
        One,
        C::Projector,
        plain("used_as_reference_projector_meeting_id"),
        One,
    ),
    with_replacement(
        rel(
            C::Meeting,
            RelationField::Template(DEFAULT_PROJECTOR),
            One,
            C::Projector,
            RelationField::Template(USED_AS_DEFAULT),
            One,
        ),
        Replacement::SameKey,
    ),
    rel(
        C::Meeting,
        plain("projector_countdown_ids"),
        Many,
        C::ProjectorCountdown,
        plain("meeting_id"),
        One,
    ),
    rel(
        C::Meeting,
        plain("list_of_speakers_countdown_id"),
        One,
        C::ProjectorCountdown,
        plain("used_as_list_of_speakers_countdown_meeting_id"),
        One,
    ),
    rel(
        C::Meeting,
        plain("poll_countdown_id"),
        One,
        C::ProjectorCountdown,
        plain("used_as_poll_countdown_meeting_id"),
        One,
    ),
    rel(C::Meeting, plain("mediafile_ids"), Many, C::Mediafile, plain("meeting_id"), One),
    with_replacement(
        rel(
            C::Meeting,
            RelationField::Template(LOGO),
            One,
            C::Mediafile,
            RelationField::Template(USED_AS_LOGO),
            One,
        ),
        Replacement::SameKey,
    ),
    with_replacement(
        rel(
            C::Meeting,
            RelationField::Template(FONT),
            One,
            C::Mediafile,
            RelationField::Template(USED_AS_FONT),
            One,
        ),
        Replacement::SameKey,
    ),
    rel(C::Meeting, plain("assignment_ids"), Many, C::Assignment, plain("meeting_id"), One),
    rel(
        C::Meeting,
        plain("assignment_candidate_ids"),
        Many,
        C::AssignmentCandidate,
        plain("meeting_id"),
        One,
    ),
    with_replacement(
        rel(
            C::Group,
            plain("user_ids"),
            Many,
            C::User,
            RelationField::Template(GROUP_IDS),
            Many,
        ),
        Replacement::FromField("meeting_id"),
    ),
    rel(
        C::Group,
        plain("mediafile_access_group_ids"),
        Many,
        C::Mediafile,
        plain("access_group_ids"),
        Many,
    ),
    rel(
        C::Group,
        plain("mediafile_inherited_access_group_ids"),
        Many,
        C::Mediafile,
        plain("inherited_access_group_ids"),
        Many,
    ),
    rel(C::Mediafile, plain("parent_id"), One, C::Mediafile, plain("child_ids"), Many),
    rel(C::MotionWorkflow, plain("state_ids"), Many, C::MotionState, plain("workflow_id"), One),
    rel(
        C::MotionWorkflow,
        plain("first_state_id"),
        One,
        C::MotionState,
        plain("first_state_of_workflow_id"),
        One,
    ),
    rel(
        C::MotionState,
        plain("next_state_ids"),
        Many,
        C::MotionState,
        plain("previous_state_ids"),
        Many,
    ),
    rel(
        C::Assignment,
        plain("candidate_ids"),
        Many,
        C::AssignmentCandidate,
        plain("assignment_id"),
        One,
    ),
    rel(
        C::User,
        plain("assignment_candidate_ids"),
        Many,
        C::AssignmentCandidate,
        plain("user_id"),
        One,
    ),
];

/// All relations whose own side lives in `collection`
pub fn relations_of(collection: Collection) -> Vec<Relation> {
    DECLARATIONS
        .iter()
        .flat_map(|relation| [*relation, relation.flipped()])
        .filter(|relation| relation.collection == collection)
        .collect()
}

/// Template fields a payload of `collection` may carry in object form
pub fn templates_of(collection: Collection) -> Vec<TemplateField> {
    let mut templates: Vec<TemplateField> = relations_of(collection)
        .iter()
        .filter_map(|relation| relation.field.template().copied())
        .collect();
    if collection == Collection::User {
        templates.push(COMMITTEE_MANAGEMENT_LEVEL);
    }
    templates.dedup();
    templates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relations_are_symmetric() {
        let group = relations_of(Collection::Group);
        let user_ids = group
            .iter()
            .find(|r| r.field == RelationField::Plain("user_ids"))
            .unwrap();
        assert_eq!(user_ids.target, Collection::User);
        assert_eq!(user_ids.reverse, RelationField::Template(GROUP_IDS));
        assert_eq!(user_ids.replacement, Replacement::FromField("meeting_id"));

        let user = relations_of(Collection::User);
        let group_ids = user
            .iter()
            .find(|r| r.field == RelationField::Template(GROUP_IDS))
            .unwrap();
        assert_eq!(group_ids.reverse, RelationField::Plain("user_ids"));
        assert_eq!(group_ids.replacement, Replacement::None);
    }

    #[test]
    fn test_self_relation_yields_both_directions() {
        let mediafile = relations_of(Collection::Mediafile);
        assert!(mediafile
            .iter()
            .any(|r| r.field == RelationField::Plain("parent_id") && r.cardinality == One));
        assert!(mediafile
            .iter()
            .any(|r| r.field == RelationField::Plain("child_ids") && r.cardinality == Many));
    }

    #[test]
    fn test_templates_of_collection() {
        assert_eq!(
            templates_of(Collection::User),
            vec![GROUP_IDS, COMMITTEE_MANAGEMENT_LEVEL]
        );
        assert_eq!(templates_of(Collection::Projector), vec![USED_AS_DEFAULT]);
        assert_eq!(
            templates_of(Collection::Meeting),
            vec![DEFAULT_PROJECTOR, LOGO, FONT]
        );
    }
}

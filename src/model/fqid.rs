use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub type Id = u64;

/// Monotonic datastore position, bumped on every successful write
pub type Position = u64;

/// All collections the action core knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Organization,
    Committee,
    Meeting,
    Group,
    User,
    Mediafile,
    MotionWorkflow,
    MotionState,
    Projector,
    ProjectorCountdown,
    Assignment,
    AssignmentCandidate,
}

impl Collection {
    pub const ALL: [Collection; 12] = [
        Collection::Organization,
        Collection::Committee,
        Collection::Meeting,
        Collection::Group,
        Collection::User,
        Collection::Mediafile,
        Collection::MotionWorkflow,
        Collection::MotionState,
        Collection::Projector,
        Collection::ProjectorCountdown,
        Collection::Assignment,
        Collection::AssignmentCandidate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Organization => "organization",
            Collection::Committee => "committee",
            Collection::Meeting => "meeting",
            Collection::Group => "group",
            Collection::User => "user",
            Collection::Mediafile => "mediafile",
            Collection::MotionWorkflow => "motion_workflow",
            Collection::MotionState => "motion_state",
            Collection::Projector => "projector",
            Collection::ProjectorCountdown => "projector_countdown",
            Collection::Assignment => "assignment",
            Collection::AssignmentCandidate => "assignment_candidate",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .iter()
            .copied()
            .find(|collection| collection.as_str() == s)
            .ok_or_else(|| format!("Unknown collection: {}", s))
    }
}

/// Fully qualified id: `collection/id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fqid {
    pub collection: Collection,
    pub id: Id,
}

impl Fqid {
    pub fn new(collection: Collection, id: Id) -> Self {
        Self { collection, id }
    }
}

impl fmt::Display for Fqid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

impl FromStr for Fqid {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (collection, id) = s
            .split_once('/')
            .ok_or_else(|| format!("Invalid fqid: {}", s))?;
        let id = id
            .parse::<Id>()
            .map_err(|_| format!("Invalid id in fqid: {}", s))?;
        Ok(Fqid::new(collection.parse()?, id))
    }
}

impl Serialize for Fqid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fqid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fqid_parse_and_display() {
        let fqid: Fqid = "projector_countdown/17".parse().unwrap();
        assert_eq!(fqid, Fqid::new(Collection::ProjectorCountdown, 17));
        assert_eq!(fqid.to_string(), "projector_countdown/17");

        assert!("meeting".parse::<Fqid>().is_err());
        assert!("meeting/abc".parse::<Fqid>().is_err());
        assert!("poll/1".parse::<Fqid>().is_err());
    }

    #[test]
    fn test_fqid_serde() {
        let fqid = Fqid::new(Collection::Group, 111);
        let json = serde_json::to_string(&fqid).unwrap();
        assert_eq!(json, "\"group/111\"");
        let parsed: Fqid = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, fqid);
    }
}

use serde_json::Value;
use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::error::ActionError;
use crate::logic::permission::PermissionEngine;
use crate::model::relations::{COMMITTEE_MANAGEMENT_LEVEL, GROUP_IDS};
use crate::model::{id_of, ids_of, is_empty_value, Collection, Fqid, Id, Record};
use crate::store::{Change, Transaction};

/// Fields derived from other fields, recomputed whenever their inputs change
pub struct CalculatedFields;

impl CalculatedFields {
    /// Run the hooks of the changed collection, queueing their own writes
    pub async fn on_change(
        tx: &mut Transaction,
        change: &Change,
        queue: &mut VecDeque<Change>,
    ) -> Result<(), ActionError> {
        match change.fqid.collection {
            Collection::User => Self::user_membership(tx, change, queue).await,
            Collection::Mediafile => Self::mediafile_access(tx, change, queue).await,
            _ => Ok(()),
        }
    }

    fn changed<F: Fn(&str) -> bool>(before: Option<&Record>, after: &Record, relevant: F) -> bool {
        let empty = Record::new();
        let before = before.unwrap_or(&empty);
        before
            .keys()
            .chain(after.keys())
            .filter(|field| relevant(field.as_str()))
            .any(|field| before.get(field.as_str()) != after.get(field.as_str()))
    }

    /// `meeting_ids` are the meetings a user has a group in, `committee_ids`
    /// the committees of those meetings plus the ones the user manages.
    async fn user_membership(
        tx: &mut Transaction,
        change: &Change,
        queue: &mut VecDeque<Change>,
    ) -> Result<(), ActionError> {
        let Some(after) = &change.after else {
            return Ok(());
        };
        let relevant = |field: &str| {
            GROUP_IDS.replacement(field).is_some()
                || COMMITTEE_MANAGEMENT_LEVEL.replacement(field).is_some()
        };
        if !Self::changed(change.before.as_ref(), after, relevant) {
            return Ok(());
        }

        let meeting_ids: BTreeSet<Id> = after
            .iter()
            .filter(|(_, value)| !is_empty_value(Some(*value)))
            .filter_map(|(field, _)| GROUP_IDS.replacement(field))
            .filter_map(|replacement| replacement.parse::<Id>().ok())
            .collect();

        let mut committee_ids: BTreeSet<Id> =
            PermissionEngine::managed_committees(after).into_iter().collect();
        for meeting_id in &meeting_ids {
            let meeting = tx
                .get_optional(
                    Fqid::new(Collection::Meeting, *meeting_id),
                    &["committee_id"],
                    false,
                )
                .await?;
            if let Some(committee_id) = meeting.and_then(|m| id_of(m.get("committee_id"))) {
                committee_ids.insert(committee_id);
            }
        }

        let meeting_ids: Vec<Id> = meeting_ids.into_iter().collect();
        let committee_ids: Vec<Id> = committee_ids.into_iter().collect();
        let mut changes = Record::new();
        if ids_of(after.get("meeting_ids")) != meeting_ids {
            changes.insert("meeting_ids".to_string(), Value::from(meeting_ids));
        }
        if ids_of(after.get("committee_ids")) != committee_ids {
            changes.insert("committee_ids".to_string(), Value::from(committee_ids));
        }
        if changes.is_empty() {
            return Ok(());
        }
        let update = tx.update(change.fqid, changes).await?;
        queue.push_back(update);
        Ok(())
    }

    /// Recompute `is_public` / `inherited_access_group_ids` for a mediafile
    /// and every descendant whose inputs changed.
    async fn mediafile_access(
        tx: &mut Transaction,
        change: &Change,
        queue: &mut VecDeque<Change>,
    ) -> Result<(), ActionError> {
        let Some(after) = &change.after else {
            return Ok(());
        };
        let relevant = |field: &str| field == "access_group_ids" || field == "parent_id";
        let uncomputed = after.get("is_public").is_none();
        if !uncomputed && !Self::changed(change.before.as_ref(), after, relevant) {
            return Ok(());
        }

        let mut stack = vec![(change.fqid.id, true)];
        let mut visited = HashSet::new();
        while let Some((id, is_root)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let fqid = Fqid::new(Collection::Mediafile, id);
            let Some(file) = tx.get_optional(fqid, &[], true).await? else {
                continue;
            };
            let own = ids_of(file.get("access_group_ids"));
            let parent = match id_of(file.get("parent_id")) {
                Some(parent_id) => {
                    tx.get_optional(
                        Fqid::new(Collection::Mediafile, parent_id),
                        &["is_public", "inherited_access_group_ids"],
                        true,
                    )
                    .await?
                }
                None => None,
            };
            let (is_public, inherited) = Self::access(own, parent.as_ref());

            let changed = file.get("is_public") != Some(&Value::Bool(is_public))
                || file.get("inherited_access_group_ids").is_none()
                || ids_of(file.get("inherited_access_group_ids")) != inherited;
            if changed {
                let mut changes = Record::new();
                changes.insert("is_public".to_string(), Value::Bool(is_public));
                changes.insert(
                    "inherited_access_group_ids".to_string(),
                    Value::from(inherited),
                );
                queue.push_back(tx.update(fqid, changes).await?);
            }
            if changed || is_root {
                for child in ids_of(file.get("child_ids")).into_iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        Ok(())
    }

    /// `(is_public, inherited_access_group_ids)` of a mediafile from its own
    /// access groups and its parent. Below a public parent the own groups
    /// apply; below a restricted one an empty list inherits the parent's and
    /// a non-empty list is narrowed to the parent's.
    fn access(own: Vec<Id>, parent: Option<&Record>) -> (bool, Vec<Id>) {
        let parent_inherited = parent.map(|p| ids_of(p.get("inherited_access_group_ids")));
        let parent_public = match (parent, &parent_inherited) {
            (Some(p), Some(inherited)) => p
                .get("is_public")
                .and_then(Value::as_bool)
                .unwrap_or(inherited.is_empty()),
            _ => true,
        };
        if parent_public {
            let is_public = own.is_empty();
            return (is_public, own);
        }
        let parent_inherited = parent_inherited.unwrap_or_default();
        if own.is_empty() {
            (false, parent_inherited)
        } else {
            let inherited = own
                .into_iter()
                .filter(|id| parent_inherited.contains(id))
                .collect();
            (false, inherited)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::cascade::CascadeEngine;
    use crate::store::InMemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn fqid(s: &str) -> Fqid {
        s.parse().unwrap()
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_access_rules() {
        let restricted = record(json!({"is_public": false, "inherited_access_group_ids": [2, 3]}));
        let public = record(json!({"is_public": true, "inherited_access_group_ids": []}));

        assert_eq!(CalculatedFields::access(vec![], None), (true, vec![]));
        assert_eq!(CalculatedFields::access(vec![4], Some(&public)), (false, vec![4]));
        assert_eq!(
            CalculatedFields::access(vec![], Some(&restricted)),
            (false, vec![2, 3])
        );
        assert_eq!(
            CalculatedFields::access(vec![3, 4], Some(&restricted)),
            (false, vec![3])
        );
    }

    #[tokio::test]
    async fn test_clearing_directory_access_keeps_child_restriction() {
        let store = InMemoryStore::new();
        store
            .set_models(json!({
                "group/1": {"id": 1, "mediafile_access_group_ids": [1], "mediafile_inherited_access_group_ids": [1, 2, 3]},
                "group/2": {"id": 2, "mediafile_access_group_ids": [2], "mediafile_inherited_access_group_ids": [2, 3]},
                "mediafile/1": {
                    "id": 1, "is_directory": true, "child_ids": [2, 3],
                    "access_group_ids": [1], "inherited_access_group_ids": [1], "is_public": false
                },
                "mediafile/2": {
                    "id": 2, "parent_id": 1, "access_group_ids": [],
                    "inherited_access_group_ids": [1], "is_public": false
                },
                "mediafile/3": {
                    "id": 3, "parent_id": 1, "access_group_ids": [2],
                    "inherited_access_group_ids": [], "is_public": false
                },
            }))
            .unwrap();
        let mut tx = Transaction::new(Arc::new(store));

        CascadeEngine::update(&mut tx, fqid("mediafile/1"), record(json!({"access_group_ids": []})))
            .await
            .unwrap();

        let dir = tx.get(fqid("mediafile/1"), &[], false).await.unwrap();
        assert_eq!(dir.get("is_public"), Some(&json!(true)));
        assert_eq!(dir.get("inherited_access_group_ids"), Some(&json!([])));

        let open = tx.get(fqid("mediafile/2"), &[], false).await.unwrap();
        assert_eq!(open.get("is_public"), Some(&json!(true)));
        assert_eq!(open.get("inherited_access_group_ids"), Some(&json!([])));

        let restricted = tx.get(fqid("mediafile/3"), &[], false).await.unwrap();
        assert_eq!(restricted.get("is_public"), Some(&json!(false)));
        assert_eq!(restricted.get("inherited_access_group_ids"), Some(&json!([2])));

        let group = tx.get(fqid("group/1"), &[], false).await.unwrap();
        assert_eq!(group.get("mediafile_access_group_ids"), Some(&json!([])));
        let group = tx.get(fqid("group/2"), &[], false).await.unwrap();
        assert_eq!(group.get("mediafile_inherited_access_group_ids"), Some(&json!([2, 3])));
    }
}

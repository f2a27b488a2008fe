use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{ActionError, DatastoreError};
use crate::model::{merge_changes, project, Collection, Filter, Fqid, Id, Position, Record};
use crate::store::traits::{Datastore, WriteEvent, WriteRequest};

/// A model write as seen by the cascade engine
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub fqid: Fqid,
    pub before: Option<Record>,
    pub after: Option<Record>,
}

#[derive(Debug, Clone)]
enum OverlayEntry {
    /// Id handed out for a create still in progress. `relations` collects
    /// reverse updates made by other models before the create is applied.
    Reserved { seed: Record, relations: Record },
    Present(Record),
    Deleted,
}

/// Write-ahead buffer for one request.
///
/// Every write lands in the overlay first and is read back from there, so
/// later steps of the same request see earlier results. Nothing reaches the
/// datastore until `commit`.
pub struct Transaction {
    store: Arc<dyn Datastore>,
    overlay: HashMap<Fqid, OverlayEntry>,
    events: Vec<WriteEvent>,
    locked_fields: BTreeMap<Fqid, Position>,
}

impl Transaction {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self {
            store,
            overlay: HashMap::new(),
            events: Vec::new(),
            locked_fields: BTreeMap::new(),
        }
    }

    pub fn events(&self) -> &[WriteEvent] {
        &self.events
    }

    async fn read(&mut self, fqid: Fqid, lock_result: bool) -> Result<Option<Record>, ActionError> {
        if let Some(entry) = self.overlay.get(&fqid) {
            return Ok(match entry {
                OverlayEntry::Reserved { seed, relations } => {
                    let mut view = seed.clone();
                    merge_changes(&mut view, relations);
                    Some(view)
                }
                OverlayEntry::Present(record) => Some(record.clone()),
                OverlayEntry::Deleted => None,
            });
        }
        let Some(versioned) = self.store.get(&fqid).await? else {
            return Ok(None);
        };
        if lock_result {
            self.locked_fields.entry(fqid).or_insert(versioned.position);
        }
        Ok(Some(versioned.fields))
    }

    /// Read a model, failing with `DoesNotExist` if it is absent
    pub async fn get(
        &mut self,
        fqid: Fqid,
        fields: &[&str],
        lock_result: bool,
    ) -> Result<Record, ActionError> {
        self.get_optional(fqid, fields, lock_result)
            .await?
            .ok_or(ActionError::DoesNotExist(fqid))
    }

    pub async fn get_optional(
        &mut self,
        fqid: Fqid,
        fields: &[&str],
        lock_result: bool,
    ) -> Result<Option<Record>, ActionError> {
        Ok(self
            .read(fqid, lock_result)
            .await?
            .map(|record| project(&record, fields)))
    }

    /// Read several models at once; absent ones are left out
    pub async fn get_many(
        &mut self,
        fqids: &[Fqid],
        fields: &[&str],
        lock_result: bool,
    ) -> Result<BTreeMap<Fqid, Record>, ActionError> {
        let mut results = BTreeMap::new();
        let mut missing = Vec::new();
        for fqid in fqids {
            if self.overlay.contains_key(fqid) {
                if let Some(record) = self.get_optional(*fqid, fields, lock_result).await? {
                    results.insert(*fqid, record);
                }
            } else {
                missing.push(*fqid);
            }
        }
        if !missing.is_empty() {
            for versioned in self.store.get_many(&missing).await? {
                if lock_result {
                    self.locked_fields
                        .entry(versioned.fqid)
                        .or_insert(versioned.position);
                }
                results.insert(versioned.fqid, project(&versioned.fields, fields));
            }
        }
        Ok(results)
    }

    /// Filter the datastore, with this transaction's writes applied on top
    pub async fn filter(
        &mut self,
        collection: Collection,
        filter: &Filter,
        fields: &[&str],
        lock_result: bool,
    ) -> Result<BTreeMap<Id, Record>, ActionError> {
        let mut results = BTreeMap::new();
        for versioned in self.store.filter(collection, filter).await? {
            if self.overlay.contains_key(&versioned.fqid) {
                continue;
            }
            if lock_result {
                self.locked_fields
                    .entry(versioned.fqid)
                    .or_insert(versioned.position);
            }
            results.insert(versioned.fqid.id, project(&versioned.fields, fields));
        }
        for (fqid, entry) in &self.overlay {
            if fqid.collection != collection {
                continue;
            }
            if let OverlayEntry::Present(record) = entry {
                if filter.matches(record) {
                    results.insert(fqid.id, project(record, fields));
                }
            }
        }
        Ok(results)
    }

    /// Reserved models count as existing
    pub async fn exists(&mut self, fqid: Fqid) -> Result<bool, ActionError> {
        Ok(self.read(fqid, false).await?.is_some())
    }

    pub fn is_deleted(&self, fqid: &Fqid) -> bool {
        matches!(self.overlay.get(fqid), Some(OverlayEntry::Deleted))
    }

    /// The model as written in this transaction, if it was
    pub fn additional_relation_model(&self, fqid: &Fqid) -> Option<Record> {
        match self.overlay.get(fqid)? {
            OverlayEntry::Present(record) => Some(record.clone()),
            OverlayEntry::Reserved { seed, relations } => {
                let mut view = seed.clone();
                merge_changes(&mut view, relations);
                Some(view)
            }
            OverlayEntry::Deleted => None,
        }
    }

    pub async fn reserve_id(&mut self, collection: Collection) -> Result<Id, ActionError> {
        self.store
            .reserve_ids(collection, 1)
            .await?
            .first()
            .copied()
            .ok_or_else(|| ActionError::Database(format!("Could not reserve an id for {}", collection)))
    }

    /// Make a reserved model readable before it is created
    pub fn stage(&mut self, fqid: Fqid, seed: Record) {
        match self.overlay.get_mut(&fqid) {
            Some(OverlayEntry::Reserved { seed: current, .. }) => *current = seed,
            _ => {
                self.overlay.insert(
                    fqid,
                    OverlayEntry::Reserved {
                        seed,
                        relations: Record::new(),
                    },
                );
            }
        }
    }

    pub async fn create(&mut self, fqid: Fqid, record: Record) -> Result<Change, ActionError> {
        let before = match self.overlay.remove(&fqid) {
            Some(OverlayEntry::Reserved { relations, .. }) => relations,
            Some(entry @ OverlayEntry::Present(_)) => {
                self.overlay.insert(fqid, entry);
                return Err(DatastoreError::ModelExists(fqid).into());
            }
            Some(OverlayEntry::Deleted) | None => {
                if self.store.get(&fqid).await?.is_some() {
                    return Err(DatastoreError::ModelExists(fqid).into());
                }
                Record::new()
            }
        };

        let mut after = before.clone();
        merge_changes(&mut after, &record);
        after.insert("id".to_string(), fqid.id.into());

        self.events.push(WriteEvent::Create {
            fqid,
            fields: after.clone(),
        });
        self.overlay
            .insert(fqid, OverlayEntry::Present(after.clone()));
        Ok(Change {
            fqid,
            before: (!before.is_empty()).then_some(before),
            after: Some(after),
        })
    }

    pub async fn update(&mut self, fqid: Fqid, changes: Record) -> Result<Change, ActionError> {
        if let Some(OverlayEntry::Reserved { seed, relations }) = self.overlay.get_mut(&fqid) {
            let mut before = seed.clone();
            merge_changes(&mut before, relations);
            merge_changes(relations, &changes);
            let mut after = seed.clone();
            merge_changes(&mut after, relations);
            return Ok(Change {
                fqid,
                before: Some(before),
                after: Some(after),
            });
        }

        let before = self
            .read(fqid, true)
            .await?
            .ok_or(ActionError::DoesNotExist(fqid))?;
        let mut after = before.clone();
        merge_changes(&mut after, &changes);

        self.events.push(WriteEvent::Update {
            fqid,
            fields: changes,
        });
        self.overlay
            .insert(fqid, OverlayEntry::Present(after.clone()));
        Ok(Change {
            fqid,
            before: Some(before),
            after: Some(after),
        })
    }

    pub async fn delete(&mut self, fqid: Fqid) -> Result<Change, ActionError> {
        if let Some(OverlayEntry::Reserved { .. }) = self.overlay.get(&fqid) {
            return Err(ActionError::Database(format!(
                "Cannot delete {} while it is being created",
                fqid
            )));
        }
        let before = self
            .read(fqid, true)
            .await?
            .ok_or(ActionError::DoesNotExist(fqid))?;

        self.events.push(WriteEvent::Delete { fqid });
        self.overlay.insert(fqid, OverlayEntry::Deleted);
        Ok(Change {
            fqid,
            before: Some(before),
            after: None,
        })
    }

    /// Write all buffered events in one request. Returns the new position,
    /// or `None` if nothing was written.
    pub async fn commit(self) -> Result<Option<Position>, ActionError> {
        if let Some(fqid) = self.overlay.iter().find_map(|(fqid, entry)| {
            matches!(entry, OverlayEntry::Reserved { .. }).then_some(*fqid)
        }) {
            return Err(ActionError::Database(format!(
                "Model {} was reserved but never created",
                fqid
            )));
        }
        if self.events.is_empty() {
            return Ok(None);
        }

        log::info!(
            "Committing {} events ({} locked models)",
            self.events.len(),
            self.locked_fields.len()
        );
        let position = self
            .store
            .write(WriteRequest {
                events: self.events,
                locked_fields: self.locked_fields,
            })
            .await?;
        Ok(Some(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn fqid(s: &str) -> Fqid {
        s.parse().unwrap()
    }

    fn store() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        store
            .set_models(json!({
                "meeting/1": {"id": 1, "name": "m", "group_ids": [1]},
                "group/1": {"id": 1, "name": "Staff", "meeting_id": 1},
            }))
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_reads_see_buffered_writes() {
        let store = store();
        let mut tx = Transaction::new(store.clone());
        tx.update(fqid("group/1"), record(json!({"name": "Admin"})))
            .await
            .unwrap();

        let group = tx.get(fqid("group/1"), &["name"], true).await.unwrap();
        assert_eq!(Value::Object(group), json!({"name": "Admin"}));

        let admins = tx
            .filter(Collection::Group, &Filter::eq("name", "Admin"), &["id"], false)
            .await
            .unwrap();
        assert_eq!(admins.keys().copied().collect::<Vec<_>>(), vec![1]);

        // Nothing reaches the store before commit
        let stored = store.get(&fqid("group/1")).await.unwrap().unwrap();
        assert_eq!(stored.fields.get("name"), Some(&json!("Staff")));

        tx.commit().await.unwrap();
        let stored = store.get(&fqid("group/1")).await.unwrap().unwrap();
        assert_eq!(stored.fields.get("name"), Some(&json!("Admin")));
    }

    #[tokio::test]
    async fn test_reserved_model_collects_relations() {
        let store = store();
        let mut tx = Transaction::new(store.clone());
        let id = tx.reserve_id(Collection::Meeting).await.unwrap();
        assert_eq!(id, 2);
        let meeting = Fqid::new(Collection::Meeting, id);
        tx.stage(meeting, record(json!({"id": id, "committee_id": 1})));

        tx.update(meeting, record(json!({"group_ids": [5]})))
            .await
            .unwrap();
        assert!(tx.events().is_empty());
        let view = tx.get(meeting, &[], false).await.unwrap();
        assert_eq!(view.get("committee_id"), Some(&json!(1)));

        let change = tx
            .create(meeting, record(json!({"name": "new"})))
            .await
            .unwrap();
        assert_eq!(change.before, Some(record(json!({"group_ids": [5]}))));
        assert_eq!(
            change.after,
            Some(record(json!({"group_ids": [5], "name": "new", "id": 2})))
        );
    }

    #[tokio::test]
    async fn test_unfinished_reservation_blocks_commit() {
        let mut tx = Transaction::new(store());
        let id = tx.reserve_id(Collection::Group).await.unwrap();
        tx.stage(Fqid::new(Collection::Group, id), Record::new());
        assert!(matches!(tx.commit().await, Err(ActionError::Database(_))));
    }

    #[tokio::test]
    async fn test_deleted_model_is_gone_inside_transaction() {
        let mut tx = Transaction::new(store());
        tx.delete(fqid("group/1")).await.unwrap();
        assert!(tx.is_deleted(&fqid("group/1")));
        assert!(matches!(
            tx.get(fqid("group/1"), &[], false).await,
            Err(ActionError::DoesNotExist(_))
        ));
        assert!(matches!(
            tx.delete(fqid("group/1")).await,
            Err(ActionError::DoesNotExist(_))
        ));
    }

    #[tokio::test]
    async fn test_create_existing_model_fails() {
        let mut tx = Transaction::new(store());
        let result = tx.create(fqid("group/1"), record(json!({"name": "x"}))).await;
        assert!(matches!(
            result,
            Err(ActionError::Datastore(DatastoreError::ModelExists(_)))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_write_is_detected_on_commit() {
        let store = store();
        let mut tx = Transaction::new(store.clone());
        tx.update(fqid("meeting/1"), record(json!({"name": "mine"})))
            .await
            .unwrap();

        store
            .set_models(json!({"meeting/1": {"id": 1, "name": "theirs"}}))
            .unwrap();

        assert!(matches!(
            tx.commit().await,
            Err(ActionError::Datastore(DatastoreError::ModelLocked(_)))
        ));
    }
}

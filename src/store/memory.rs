use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::DatastoreError;
use crate::model::{merge_changes, Collection, Filter, Fqid, Id, Position, Record};
use crate::store::traits::{Datastore, VersionedRecord, WriteEvent, WriteRequest};

#[derive(Debug, Clone)]
struct StoredModel {
    fields: Record,
    position: Position,
    /// Deleted models keep their last fields
    deleted: bool,
}

#[derive(Debug, Default)]
struct State {
    models: HashMap<Fqid, StoredModel>,
    max_ids: HashMap<Collection, Id>,
    position: Position,
}

impl State {
    fn bump_max_id(&mut self, fqid: &Fqid) {
        let max = self.max_ids.entry(fqid.collection).or_insert(0);
        if fqid.id > *max {
            *max = fqid.id;
        }
    }
}

/// Reference datastore kept entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load models from a `{"collection/id": {fields}}` map as one write.
    /// Missing `id` fields are filled in.
    pub fn set_models(&self, models: Value) -> Result<Position, DatastoreError> {
        let Value::Object(models) = models else {
            return Err(DatastoreError::InvalidData(
                "models must be a map of fqid to fields".to_string(),
            ));
        };

        let mut state = self.state.write();
        state.position += 1;
        let position = state.position;
        for (key, fields) in models {
            let fqid: Fqid = key.parse().map_err(DatastoreError::InvalidData)?;
            let Value::Object(mut fields) = fields else {
                return Err(DatastoreError::InvalidData(format!(
                    "fields of {} must be an object",
                    fqid
                )));
            };
            fields.entry("id").or_insert(Value::from(fqid.id));
            state.bump_max_id(&fqid);
            state.models.insert(
                fqid,
                StoredModel {
                    fields,
                    position,
                    deleted: false,
                },
            );
        }
        Ok(position)
    }

    /// Last fields of a deleted model
    pub fn get_deleted(&self, fqid: &Fqid) -> Option<Record> {
        let state = self.state.read();
        state
            .models
            .get(fqid)
            .filter(|model| model.deleted)
            .map(|model| model.fields.clone())
    }

    pub fn position(&self) -> Position {
        self.state.read().position
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .models
            .values()
            .filter(|model| !model.deleted)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl Datastore for InMemoryStore {
    async fn get(&self, fqid: &Fqid) -> Result<Option<VersionedRecord>, DatastoreError> {
        let state = self.state.read();
        Ok(state
            .models
            .get(fqid)
            .filter(|model| !model.deleted)
            .map(|model| VersionedRecord {
                fqid: *fqid,
                fields: model.fields.clone(),
                position: model.position,
            }))
    }

    async fn filter(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<VersionedRecord>, DatastoreError> {
        let state = self.state.read();
        let mut records: Vec<VersionedRecord> = state
            .models
            .iter()
            .filter(|(fqid, model)| {
                fqid.collection == collection && !model.deleted && filter.matches(&model.fields)
            })
            .map(|(fqid, model)| VersionedRecord {
                fqid: *fqid,
                fields: model.fields.clone(),
                position: model.position,
            })
            .collect();
        records.sort_by_key(|record| record.fqid.id);
        Ok(records)
    }

    async fn reserve_ids(
        &self,
        collection: Collection,
        amount: usize,
    ) -> Result<Vec<Id>, DatastoreError> {
        let mut state = self.state.write();
        let max = state.max_ids.entry(collection).or_insert(0);
        let first = *max + 1;
        *max += amount as Id;
        Ok((first..=*max).collect())
    }

    async fn write(&self, request: WriteRequest) -> Result<Position, DatastoreError> {
        let mut state = self.state.write();

        for (fqid, read_position) in &request.locked_fields {
            if let Some(model) = state.models.get(fqid) {
                if model.position > *read_position {
                    log::warn!(
                        "Rejecting write: {} moved from position {} to {}",
                        fqid,
                        read_position,
                        model.position
                    );
                    return Err(DatastoreError::ModelLocked(*fqid));
                }
            }
        }

        // Validate against a scratch copy first so a failing event leaves the
        // store untouched.
        let position = state.position + 1;
        let mut staged: HashMap<Fqid, StoredModel> = HashMap::new();
        for event in &request.events {
            let fqid = event.fqid();
            let current = staged
                .get(&fqid)
                .or_else(|| state.models.get(&fqid))
                .filter(|model| !model.deleted)
                .cloned();
            let next = match (event, current) {
                (WriteEvent::Create { fields, .. }, None) => StoredModel {
                    fields: fields.clone(),
                    position,
                    deleted: false,
                },
                (WriteEvent::Create { .. }, Some(_)) => {
                    return Err(DatastoreError::ModelExists(fqid));
                }
                (WriteEvent::Update { fields, .. }, Some(mut model)) => {
                    merge_changes(&mut model.fields, fields);
                    model.position = position;
                    model
                }
                (WriteEvent::Delete { .. }, Some(mut model)) => {
                    model.deleted = true;
                    model.position = position;
                    model
                }
                (_, None) => return Err(DatastoreError::DoesNotExist(fqid)),
            };
            staged.insert(fqid, next);
        }

        for (fqid, model) in staged {
            state.bump_max_id(&fqid);
            state.models.insert(fqid, model);
        }
        state.position = position;
        log::debug!(
            "Applied {} events at position {}",
            request.events.len(),
            position
        );
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn fields(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn fqid(s: &str) -> Fqid {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        let store = InMemoryStore::new();
        let position = store
            .write(WriteRequest {
                events: vec![
                    WriteEvent::Create {
                        fqid: fqid("group/1"),
                        fields: fields(json!({"id": 1, "name": "Staff"})),
                    },
                    WriteEvent::Update {
                        fqid: fqid("group/1"),
                        fields: fields(json!({"name": "Delegates"})),
                    },
                ],
                locked_fields: BTreeMap::new(),
            })
            .await
            .unwrap();

        let record = store.get(&fqid("group/1")).await.unwrap().unwrap();
        assert_eq!(record.position, position);
        assert_eq!(record.fields.get("name"), Some(&json!("Delegates")));
    }

    #[tokio::test]
    async fn test_failed_write_is_atomic() {
        let store = InMemoryStore::new();
        store
            .set_models(json!({"group/1": {"id": 1, "name": "Staff"}}))
            .unwrap();

        let result = store
            .write(WriteRequest {
                events: vec![
                    WriteEvent::Update {
                        fqid: fqid("group/1"),
                        fields: fields(json!({"name": "Changed"})),
                    },
                    WriteEvent::Delete {
                        fqid: fqid("group/2"),
                    },
                ],
                locked_fields: BTreeMap::new(),
            })
            .await;

        assert!(matches!(result, Err(DatastoreError::DoesNotExist(_))));
        let record = store.get(&fqid("group/1")).await.unwrap().unwrap();
        assert_eq!(record.fields.get("name"), Some(&json!("Staff")));
    }

    #[tokio::test]
    async fn test_locked_model_rejects_stale_write() {
        let store = InMemoryStore::new();
        let first = store
            .set_models(json!({"meeting/1": {"id": 1, "name": "m"}}))
            .unwrap();
        store
            .set_models(json!({"meeting/1": {"id": 1, "name": "moved"}}))
            .unwrap();

        let result = store
            .write(WriteRequest {
                events: vec![WriteEvent::Update {
                    fqid: fqid("meeting/1"),
                    fields: fields(json!({"name": "stale"})),
                }],
                locked_fields: BTreeMap::from([(fqid("meeting/1"), first)]),
            })
            .await;

        assert!(matches!(result, Err(DatastoreError::ModelLocked(_))));
    }

    #[tokio::test]
    async fn test_deleted_models_are_hidden_but_kept() {
        let store = InMemoryStore::new();
        store
            .set_models(json!({"group/1": {"id": 1, "name": "Staff"}}))
            .unwrap();
        store
            .write(WriteRequest {
                events: vec![WriteEvent::Delete {
                    fqid: fqid("group/1"),
                }],
                locked_fields: BTreeMap::new(),
            })
            .await
            .unwrap();

        assert!(store.get(&fqid("group/1")).await.unwrap().is_none());
        assert_eq!(
            store.get_deleted(&fqid("group/1")).unwrap().get("name"),
            Some(&json!("Staff"))
        );
        let all = store
            .filter(Collection::Group, &Filter::eq("name", "Staff"))
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_reserve_ids_continues_after_loaded_models() {
        let store = InMemoryStore::new();
        store.set_models(json!({"user/5": {"id": 5}})).unwrap();
        let ids = store.reserve_ids(Collection::User, 2).await.unwrap();
        assert_eq!(ids, vec![6, 7]);
        let ids = store.reserve_ids(Collection::Group, 1).await.unwrap();
        assert_eq!(ids, vec![1]);
    }
}

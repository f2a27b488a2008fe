use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::DatastoreError;
use crate::model::{Collection, Filter, Fqid, Id, Position, Record};

/// A stored model together with the position it was last written at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedRecord {
    pub fqid: Fqid,
    pub fields: Record,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WriteEvent {
    Create { fqid: Fqid, fields: Record },
    /// `null` values remove the field
    Update { fqid: Fqid, fields: Record },
    Delete { fqid: Fqid },
}

impl WriteEvent {
    pub fn fqid(&self) -> Fqid {
        match self {
            WriteEvent::Create { fqid, .. }
            | WriteEvent::Update { fqid, .. }
            | WriteEvent::Delete { fqid } => *fqid,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub events: Vec<WriteEvent>,
    /// Models read for this write and the position they were read at
    pub locked_fields: BTreeMap<Fqid, Position>,
}

/// Versioned document store keyed by `collection/id`.
///
/// `write` is atomic: either every event is applied under one new position or
/// nothing is.
#[async_trait::async_trait]
pub trait Datastore: Send + Sync {
    async fn get(&self, fqid: &Fqid) -> Result<Option<VersionedRecord>, DatastoreError>;

    async fn get_many(&self, fqids: &[Fqid]) -> Result<Vec<VersionedRecord>, DatastoreError> {
        let mut records = Vec::with_capacity(fqids.len());
        for fqid in fqids {
            if let Some(record) = self.get(fqid).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn filter(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<VersionedRecord>, DatastoreError>;

    async fn reserve_ids(&self, collection: Collection, amount: usize)
        -> Result<Vec<Id>, DatastoreError>;

    async fn write(&self, request: WriteRequest) -> Result<Position, DatastoreError>;
}

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::model::{Collection, Fqid, Record};
use crate::store::traits::{Datastore, WriteEvent, WriteRequest};

pub const SUPERADMIN_ID: u64 = 1;
pub const DEFAULT_COMMITTEE_ID: u64 = 1;

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

/// The models a fresh installation starts with: the organization, a
/// superadmin and one committee managed by that superadmin.
pub fn initial_models() -> Vec<(Fqid, Record)> {
    vec![
        (
            Fqid::new(Collection::Organization, 1),
            record(json!({
                "id": 1,
                "name": "Test Organization",
                "committee_ids": [DEFAULT_COMMITTEE_ID],
            })),
        ),
        (
            Fqid::new(Collection::User, SUPERADMIN_ID),
            record(json!({
                "id": SUPERADMIN_ID,
                "username": "admin",
                "first_name": "Administrator",
                "is_active": true,
                "organization_management_level": "superadmin",
                "committee_$_management_level": ["can_manage"],
                "committee_$can_manage_management_level": [DEFAULT_COMMITTEE_ID],
                "committee_ids": [DEFAULT_COMMITTEE_ID],
            })),
        ),
        (
            Fqid::new(Collection::Committee, DEFAULT_COMMITTEE_ID),
            record(json!({
                "id": DEFAULT_COMMITTEE_ID,
                "name": "Default committee",
                "organization_id": 1,
                "user_ids": [SUPERADMIN_ID],
                "manager_ids": [SUPERADMIN_ID],
                "meeting_ids": [],
            })),
        ),
    ]
}

/// Write the initial models unless the superadmin already exists
pub async fn load_seed_data(store: &dyn Datastore) -> Result<()> {
    let superadmin = Fqid::new(Collection::User, SUPERADMIN_ID);
    if store
        .get(&superadmin)
        .await
        .context("Failed to look up the superadmin")?
        .is_some()
    {
        log::info!("Seed data already present, skipping");
        return Ok(());
    }

    let events = initial_models()
        .into_iter()
        .map(|(fqid, fields)| WriteEvent::Create { fqid, fields })
        .collect();
    let position = store
        .write(WriteRequest {
            events,
            locked_fields: BTreeMap::new(),
        })
        .await
        .context("Failed to write seed data")?;
    log::info!("Seed data written at position {}", position);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn test_seed_is_written_once() {
        let store = InMemoryStore::new();
        load_seed_data(&store).await.unwrap();
        let position = store.position();
        load_seed_data(&store).await.unwrap();
        assert_eq!(store.position(), position);

        let admin = store
            .get(&Fqid::new(Collection::User, SUPERADMIN_ID))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            admin.fields.get("organization_management_level"),
            Some(&json!("superadmin"))
        );
    }
}

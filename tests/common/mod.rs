#![allow(dead_code)]

use meeting_actions::{
    ActionError, ActionHandler, ActionRequest, ActionsResponse, Datastore, Fqid, Id,
    InMemoryStore, Record,
};
use serde_json::Value;
use std::sync::Arc;

pub const ADMIN_ID: Id = 1;

/// In-memory store with a superadmin `user/1` plus the given models
pub fn store_with(models: Value) -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    store
        .set_models(serde_json::json!({
            "organization/1": {"name": "Test Organization"},
            "user/1": {"username": "admin", "organization_management_level": "superadmin"},
        }))
        .unwrap();
    store.set_models(models).unwrap();
    Arc::new(store)
}

pub fn payload(value: Value) -> Record {
    value.as_object().cloned().expect("payload must be an object")
}

pub async fn request(
    store: &Arc<InMemoryStore>,
    user_id: Id,
    action: &str,
    data: Vec<Value>,
) -> Result<ActionsResponse, ActionError> {
    let handler = ActionHandler::new(store.clone());
    handler
        .handle_request(
            user_id,
            vec![ActionRequest::new(
                action,
                data.into_iter().map(payload).collect(),
            )],
        )
        .await
}

pub async fn model(store: &Arc<InMemoryStore>, fqid: &str) -> Record {
    let fqid: Fqid = fqid.parse().unwrap();
    store
        .get(&fqid)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("{} does not exist", fqid))
        .fields
}

pub async fn assert_model(store: &Arc<InMemoryStore>, fqid: &str, expected: Value) {
    let record = model(store, fqid).await;
    for (field, value) in payload(expected) {
        assert_eq!(
            record.get(&field),
            Some(&value),
            "{}.{} in {:?}",
            fqid,
            field,
            record
        );
    }
}

pub fn assert_deleted(store: &Arc<InMemoryStore>, fqid: &str) {
    let fqid: Fqid = fqid.parse().unwrap();
    assert!(store.get_deleted(&fqid).is_some(), "{} is not deleted", fqid);
}

/// Compare fields of the last state a deleted model had
pub fn assert_deleted_model(store: &Arc<InMemoryStore>, fqid: &str, expected: Value) {
    let parsed: Fqid = fqid.parse().unwrap();
    let record = store
        .get_deleted(&parsed)
        .unwrap_or_else(|| panic!("{} is not deleted", fqid));
    for (field, value) in payload(expected) {
        assert_eq!(record.get(&field), Some(&value), "{}.{} in {:?}", fqid, field, record);
    }
}

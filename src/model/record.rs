use serde_json::{Map, Value};

use crate::model::Id;

/// A model's fields as stored in the datastore
pub type Record = Map<String, Value>;

/// Action payloads are plain records until they are applied
pub type Instance = Record;

/// Read a list-of-ids field. Single ids are returned as a one-element list.
pub fn ids_of(value: Option<&Value>) -> Vec<Id> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_u64).collect(),
        Some(Value::Number(n)) => n.as_u64().into_iter().collect(),
        _ => Vec::new(),
    }
}

pub fn id_of(value: Option<&Value>) -> Option<Id> {
    value.and_then(Value::as_u64)
}

/// Read a list of strings (template structure fields)
pub fn strings_of(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Array(items)) => items.is_empty(),
        _ => false,
    }
}

/// Apply an update to a record. `null` removes the field.
pub fn merge_changes(record: &mut Record, changes: &Record) {
    for (field, value) in changes {
        if value.is_null() {
            record.remove(field);
        } else {
            record.insert(field.clone(), value.clone());
        }
    }
}

/// Restrict a record to the requested fields; an empty selection keeps everything
pub fn project(record: &Record, fields: &[&str]) -> Record {
    if fields.is_empty() {
        return record.clone();
    }
    fields
        .iter()
        .filter_map(|field| {
            record
                .get(*field)
                .map(|value| (field.to_string(), value.clone()))
        })
        .collect()
}

/// A field family such as `group_$_ids` / `group_$22_ids`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateField {
    pub prefix: &'static str,
    pub suffix: &'static str,
}

impl TemplateField {
    pub const fn new(prefix: &'static str, suffix: &'static str) -> Self {
        Self { prefix, suffix }
    }

    /// The structure field listing the replacements in use
    pub fn structure(&self) -> String {
        format!("{}{}", self.prefix, self.suffix)
    }

    pub fn concrete(&self, replacement: &str) -> String {
        format!("{}{}{}", self.prefix, replacement, self.suffix)
    }

    /// Extract the replacement from a concrete field name
    pub fn replacement<'a>(&self, field: &'a str) -> Option<&'a str> {
        let rest = field.strip_prefix(self.prefix)?;
        let replacement = rest.strip_suffix(self.suffix)?;
        if replacement.is_empty() {
            None
        } else {
            Some(replacement)
        }
    }
}

/// Add or drop `replacement` from the structure field depending on whether the
/// concrete field still carries a value.
pub fn sync_structure_field(
    changes: &mut Record,
    current: &Record,
    template: &TemplateField,
    replacement: &str,
    has_value: bool,
) {
    let structure = template.structure();
    let mut keys = strings_of(changes.get(&structure).or_else(|| current.get(&structure)));
    let present = keys.iter().any(|key| key == replacement);
    if has_value && !present {
        keys.push(replacement.to_string());
    } else if !has_value && present {
        keys.retain(|key| key != replacement);
    } else {
        return;
    }
    changes.insert(structure, Value::from(keys));
}

/// Expand template payloads (`{"group_$_ids": {"22": [1]}}`) into concrete
/// fields plus the structure field, merged with the existing structure.
pub fn expand_template_payload(
    mut instance: Record,
    templates: &[TemplateField],
    existing: Option<&Record>,
) -> Record {
    let empty = Record::new();
    let current = existing.unwrap_or(&empty);
    for template in templates {
        let structure = template.structure();
        let Some(Value::Object(entries)) = instance.remove(&structure) else {
            continue;
        };
        for (replacement, value) in entries {
            let has_value = !is_empty_value(Some(&value));
            instance.insert(template.concrete(&replacement), value);
            sync_structure_field(&mut instance, current, template, &replacement, has_value);
        }
    }
    instance
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_template_field_names() {
        let template = TemplateField::new("group_$", "_ids");
        assert_eq!(template.structure(), "group_$_ids");
        assert_eq!(template.concrete("22"), "group_$22_ids");
        assert_eq!(template.replacement("group_$22_ids"), Some("22"));
        assert_eq!(template.replacement("group_$_ids"), None);
        assert_eq!(template.replacement("user_ids"), None);
    }

    #[test]
    fn test_expand_template_payload_merges_structure() {
        let template = TemplateField::new("group_$", "_ids");
        let existing = record(json!({"group_$_ids": ["7"], "group_$7_ids": [3]}));
        let instance = record(json!({"id": 1, "group_$_ids": {"22": [111], "7": []}}));

        let expanded = expand_template_payload(instance, &[template], Some(&existing));

        assert_eq!(expanded.get("group_$22_ids"), Some(&json!([111])));
        assert_eq!(expanded.get("group_$7_ids"), Some(&json!([])));
        assert_eq!(expanded.get("group_$_ids"), Some(&json!(["22"])));
    }

    #[test]
    fn test_merge_changes_removes_null_fields() {
        let mut current = record(json!({"a": 1, "b": [1, 2]}));
        merge_changes(&mut current, &record(json!({"a": null, "b": [], "c": true})));
        assert_eq!(Value::Object(current), json!({"b": [], "c": true}));
    }

    #[test]
    fn test_ids_of_accepts_single_and_list() {
        assert_eq!(ids_of(Some(&json!([1, 2]))), vec![1, 2]);
        assert_eq!(ids_of(Some(&json!(5))), vec![5]);
        assert!(ids_of(Some(&Value::Null)).is_empty());
        assert!(ids_of(None).is_empty());
    }
}

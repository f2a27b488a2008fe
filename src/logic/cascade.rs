use serde_json::Value;
use std::collections::{BTreeSet, VecDeque};

use crate::error::ActionError;
use crate::logic::calculated::CalculatedFields;
use crate::model::relations::{relations_of, Cardinality, Relation, RelationField, Replacement};
use crate::model::{
    id_of, ids_of, is_empty_value, sync_structure_field, Fqid, Id, Record, TemplateField,
};
use crate::store::{Change, Transaction};

/// Upper bound on processed changes per cascade
const MAX_STEPS: usize = 10_000;

/// One concrete relation field of a source model, with the ids it pointed
/// to before and after the change
struct FieldDiff {
    key: Option<String>,
    removed: Vec<Id>,
    added: Vec<Id>,
}

/// Where a reverse update lands on the target model
struct ReverseField {
    name: String,
    template: Option<(TemplateField, String)>,
}

/// Keeps both sides of every relation in sync and recomputes calculated
/// fields, processing follow-up changes from a worklist until it is empty.
pub struct CascadeEngine;

impl CascadeEngine {
    /// Create `fqid` and bring every related model up to date
    pub async fn create(tx: &mut Transaction, fqid: Fqid, record: Record) -> Result<(), ActionError> {
        let change = tx.create(fqid, record).await?;
        Self::run(tx, change).await
    }

    /// Apply `changes` to `fqid`. `null` values remove fields; relation
    /// targets that were added or removed get their reverse field fixed.
    pub async fn update(tx: &mut Transaction, fqid: Fqid, changes: Record) -> Result<(), ActionError> {
        let change = tx.update(fqid, changes).await?;
        Self::run(tx, change).await
    }

    /// Delete `fqid` and retract it from every model that referenced it
    pub async fn delete(tx: &mut Transaction, fqid: Fqid) -> Result<(), ActionError> {
        let change = tx.delete(fqid).await?;
        Self::run(tx, change).await
    }

    async fn run(tx: &mut Transaction, initial: Change) -> Result<(), ActionError> {
        let mut queue = VecDeque::from([initial]);
        let mut steps = 0;
        while let Some(change) = queue.pop_front() {
            steps += 1;
            if steps > MAX_STEPS {
                return Err(ActionError::Database(format!(
                    "Relation cascade for {} did not settle",
                    change.fqid
                )));
            }
            Self::propagate(tx, &change, &mut queue).await?;
            CalculatedFields::on_change(tx, &change, &mut queue).await?;
        }
        log::debug!("Cascade settled after {} changes", steps);
        Ok(())
    }

    async fn propagate(
        tx: &mut Transaction,
        change: &Change,
        queue: &mut VecDeque<Change>,
    ) -> Result<(), ActionError> {
        let empty = Record::new();
        let before = change.before.as_ref().unwrap_or(&empty);
        let after = change.after.as_ref().unwrap_or(&empty);

        for relation in relations_of(change.fqid.collection) {
            for diff in Self::diff(&relation, before, after) {
                for target_id in diff.removed {
                    let Some(reverse) = Self::reverse_field(&relation, diff.key.as_deref(), before)
                    else {
                        continue;
                    };
                    let target = Fqid::new(relation.target, target_id);
                    Self::apply_reverse(tx, &relation, target, reverse, change.fqid.id, false, queue)
                        .await?;
                }
                for target_id in diff.added {
                    let Some(reverse) = Self::reverse_field(&relation, diff.key.as_deref(), after)
                    else {
                        continue;
                    };
                    let target = Fqid::new(relation.target, target_id);
                    Self::apply_reverse(tx, &relation, target, reverse, change.fqid.id, true, queue)
                        .await?;
                }
            }
        }
        Ok(())
    }

    fn diff(relation: &Relation, before: &Record, after: &Record) -> Vec<FieldDiff> {
        let fields: Vec<(String, Option<String>)> = match relation.field {
            RelationField::Plain(name) => vec![(name.to_string(), None)],
            RelationField::Template(template) => before
                .keys()
                .chain(after.keys())
                .filter_map(|field| {
                    template
                        .replacement(field)
                        .map(|key| (field.clone(), Some(key.to_string())))
                })
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        };

        fields
            .into_iter()
            .filter_map(|(field, key)| {
                let old = ids_of(before.get(&field));
                let new = ids_of(after.get(&field));
                let removed: Vec<Id> = old.iter().filter(|id| !new.contains(*id)).copied().collect();
                let added: Vec<Id> = new.iter().filter(|id| !old.contains(*id)).copied().collect();
                (!removed.is_empty() || !added.is_empty()).then_some(FieldDiff {
                    key,
                    removed,
                    added,
                })
            })
            .collect()
    }

    fn reverse_field(relation: &Relation, key: Option<&str>, source: &Record) -> Option<ReverseField> {
        match relation.reverse {
            RelationField::Plain(name) => Some(ReverseField {
                name: name.to_string(),
                template: None,
            }),
            RelationField::Template(template) => {
                let replacement = match relation.replacement {
                    Replacement::SameKey => key.map(str::to_string),
                    Replacement::FromField(field) => id_of(source.get(field)).map(|id| id.to_string()),
                    Replacement::None => None,
                };
                let Some(replacement) = replacement else {
                    log::warn!(
                        "No replacement for {} on {}, skipping reverse update",
                        template.structure(),
                        relation.target
                    );
                    return None;
                };
                Some(ReverseField {
                    name: template.concrete(&replacement),
                    template: Some((template, replacement)),
                })
            }
        }
    }

    async fn apply_reverse(
        tx: &mut Transaction,
        relation: &Relation,
        target: Fqid,
        reverse: ReverseField,
        source_id: Id,
        add: bool,
        queue: &mut VecDeque<Change>,
    ) -> Result<(), ActionError> {
        if tx.is_deleted(&target) {
            return Ok(());
        }
        let Some(current) = tx.get_optional(target, &[], true).await? else {
            if add {
                return Err(ActionError::DoesNotExist(target));
            }
            log::warn!(
                "{} is referenced by {}/{} but does not exist",
                target,
                relation.collection,
                source_id
            );
            return Ok(());
        };

        let value = current.get(&reverse.name);
        let new_value = match relation.reverse_cardinality {
            Cardinality::Many => {
                let mut ids = ids_of(value);
                let present = ids.contains(&source_id);
                if add && !present {
                    ids.push(source_id);
                } else if !add && present {
                    ids.retain(|id| *id != source_id);
                } else {
                    return Ok(());
                }
                Value::from(ids)
            }
            Cardinality::One => {
                let holds_source = id_of(value) == Some(source_id);
                match (add, holds_source) {
                    (true, false) => Value::from(source_id),
                    (false, true) => Value::Null,
                    _ => return Ok(()),
                }
            }
        };

        let has_value = !is_empty_value(Some(&new_value));
        let mut changes = Record::new();
        changes.insert(reverse.name, new_value);
        if let Some((template, replacement)) = &reverse.template {
            sync_structure_field(&mut changes, &current, template, replacement, has_value);
        }

        let change = tx.update(target, changes).await?;
        if change.before != change.after {
            queue.push_back(change);
        }
        Ok(())
    }
}

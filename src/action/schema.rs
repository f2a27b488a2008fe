use itertools::Itertools;

use crate::action::ActionBehavior;
use crate::error::ActionError;
use crate::model::Instance;

/// Required and allowed payload fields of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSchema {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

impl ActionSchema {
    pub const fn new(required: &'static [&'static str], optional: &'static [&'static str]) -> Self {
        Self { required, optional }
    }

    /// Update and delete payloads always carry the target id
    pub fn validate(&self, behavior: ActionBehavior, instance: &Instance) -> Result<(), ActionError> {
        let id_required = behavior != ActionBehavior::Create;
        let missing: Vec<&str> = self
            .required
            .iter()
            .copied()
            .chain(id_required.then_some("id"))
            .filter(|field| instance.get(*field).map_or(true, |value| value.is_null()))
            .collect();
        if !missing.is_empty() {
            return Err(ActionError::action(format!(
                "data must contain [{}] properties",
                missing.iter().map(|field| format!("'{}'", field)).join(", ")
            )));
        }

        let unknown: Vec<&String> = instance
            .keys()
            .filter(|field| {
                let field = field.as_str();
                !(self.required.contains(&field)
                    || self.optional.contains(&field)
                    || (id_required && field == "id"))
            })
            .sorted()
            .collect();
        if !unknown.is_empty() {
            return Err(ActionError::action(format!(
                "data must not contain {{{}}} properties",
                unknown.iter().map(|field| format!("'{}'", field)).join(", ")
            )));
        }

        if id_required && instance.get("id").and_then(|id| id.as_u64()).is_none() {
            return Err(ActionError::action("data.id must be a positive integer"));
        }
        Ok(())
    }
}

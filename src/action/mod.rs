pub mod actions;
pub mod context;
pub mod handler;
pub mod registry;
pub mod schema;
pub mod strategy;

pub use context::ActionContext;
pub use handler::ActionHandler;
pub use registry::ActionKind;
pub use schema::ActionSchema;
pub use strategy::*;

use crate::error::ActionError;
use crate::model::{Collection, Instance};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionBehavior {
    Create,
    Update,
    Delete,
}

/// A single mutating operation on one collection.
///
/// Payloads pass through `schema`, `permission`, `validate_fields`, the
/// static dependencies and `update_instance` before they are applied.
#[async_trait::async_trait]
pub trait Action: Send + Sync {
    fn kind(&self) -> ActionKind;

    fn collection(&self) -> Collection;

    fn behavior(&self) -> ActionBehavior;

    fn schema(&self) -> ActionSchema;

    fn permission(&self) -> &'static dyn PermissionStrategy;

    /// Actions executed for every created payload before `update_instance`
    fn dependencies(&self) -> &'static [ActionKind] {
        &[]
    }

    fn dependent_action_data(&self, _instance: &Instance, _kind: ActionKind) -> Vec<Instance> {
        Vec::new()
    }

    async fn validate_fields(
        &self,
        _ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        Ok(instance)
    }

    async fn update_instance(
        &self,
        _ctx: &mut ActionContext<'_>,
        instance: Instance,
    ) -> Result<Instance, ActionError> {
        Ok(instance)
    }
}

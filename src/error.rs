use thiserror::Error;

use crate::model::{CommitteeManagementLevel, Fqid, Id, OrganizationManagementLevel, Permission};

#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("Model '{0}' does not exist.")]
    DoesNotExist(Fqid),
    #[error("Model '{0}' already exists.")]
    ModelExists(Fqid),
    #[error("Model '{0}' was modified in the meantime.")]
    ModelLocked(Fqid),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// The specific capability a user was missing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MissingPermission {
    #[error("Missing permission: Permission {permission} in meeting {meeting_id}")]
    Permission {
        permission: Permission,
        meeting_id: Id,
    },
    #[error("Missing OrganizationManagementLevel: {0}")]
    OrganizationLevel(OrganizationManagementLevel),
    #[error("Missing permission: CommitteeManagementLevel {level} in committee {committee_id}")]
    CommitteeLevel {
        level: CommitteeManagementLevel,
        committee_id: Id,
    },
}

#[derive(Debug, Error)]
pub enum ActionError {
    /// Business rule or payload validation failure
    #[error("{0}")]
    Action(String),
    #[error(transparent)]
    MissingPermission(#[from] MissingPermission),
    #[error("Model '{0}' does not exist.")]
    DoesNotExist(Fqid),
    /// Inconsistent data detected while processing
    #[error("Error in database: {0}")]
    Database(String),
    #[error(transparent)]
    Datastore(#[from] DatastoreError),
}

impl ActionError {
    pub fn action(message: impl Into<String>) -> Self {
        ActionError::Action(message.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ActionError::MissingPermission(_) => 403,
            _ => 400,
        }
    }
}

//! Error types for entities and entity platforms

use ha_core::EntityIdError;
use thiserror::Error;

use crate::entity::EntityLifecycle;

pub type EntityResult<T> = Result<T, EntityError>;

#[derive(Debug, Error)]
pub enum EntityError {
    /// A lifecycle operation was called out of order
    #[error("cannot {operation} entity '{unique_id}' while {state:?}")]
    InvalidLifecycle {
        unique_id: String,
        operation: &'static str,
        state: EntityLifecycle,
    },

    #[error(transparent)]
    InvalidEntityId(#[from] EntityIdError),

    /// Integration data the platform expected was never stored
    #[error("no {domain} data stored for entry '{key}'")]
    MissingData { domain: String, key: String },

    /// The entity failed to refresh itself
    #[error("update of '{entity}' failed: {reason}")]
    UpdateFailed { entity: String, reason: String },
}

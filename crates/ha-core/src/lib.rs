//! Core types for Home Assistant
//!
//! This crate provides the fundamental types shared by the host and its
//! integrations: EntityId, State and Context, plus the well-known state
//! values every entity renders into.

mod context;
mod entity_id;
mod state;

pub use context::Context;
pub use entity_id::{slugify, EntityId, EntityIdError};
pub use state::State;

/// Maximum length for a state value (matches Python HA)
pub const MAX_STATE_LENGTH: usize = 255;

/// State value for a binary entity that is on
pub const STATE_ON: &str = "on";

/// State value for a binary entity that is off
pub const STATE_OFF: &str = "off";

/// State value used when the entity has no known value yet
pub const STATE_UNKNOWN: &str = "unknown";

/// State value used when the entity's device is unreachable
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// Well-known state attribute keys
pub mod attributes {
    pub const ATTR_FRIENDLY_NAME: &str = "friendly_name";
    pub const ATTR_ICON: &str = "icon";
    pub const ATTR_DEVICE_CLASS: &str = "device_class";
}

//! State type representing an entity's current state

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Context, EntityId, MAX_STATE_LENGTH, STATE_UNAVAILABLE, STATE_UNKNOWN};

/// The state of an entity as last written by its integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    /// The entity this state belongs to
    pub entity_id: EntityId,

    /// The state value (e.g., "on", "off", "unavailable")
    pub state: String,

    /// Additional attributes associated with the state
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// When the state value last changed
    pub last_changed: DateTime<Utc>,

    /// When the state or its attributes were last written
    pub last_updated: DateTime<Utc>,

    /// Context of the write that produced this state
    pub context: Context,
}

impl State {
    /// Create a new state stamped with the current time
    ///
    /// Values longer than [`MAX_STATE_LENGTH`] are replaced by `unknown`.
    pub fn new(
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> Self {
        let now = Utc::now();
        Self {
            entity_id,
            state: clamp_state(state.into()),
            attributes,
            last_changed: now,
            last_updated: now,
            context,
        }
    }

    /// Create the successor of this state
    ///
    /// `last_changed` is carried over when the value is unchanged, so an
    /// attribute-only write does not look like a transition.
    pub fn with_update(
        &self,
        new_state: impl Into<String>,
        new_attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> Self {
        let now = Utc::now();
        let new_state = clamp_state(new_state.into());
        let last_changed = if self.state == new_state {
            self.last_changed
        } else {
            now
        };

        Self {
            entity_id: self.entity_id.clone(),
            state: new_state,
            attributes: new_attributes,
            last_changed,
            last_updated: now,
            context,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.state == STATE_UNAVAILABLE
    }

    pub fn is_unknown(&self) -> bool {
        self.state == STATE_UNKNOWN
    }

    /// Get an attribute value by key
    pub fn attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

fn clamp_state(state: String) -> String {
    if state.len() > MAX_STATE_LENGTH {
        STATE_UNKNOWN.to_string()
    } else {
        state
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        // Timestamps and context are not compared
        self.entity_id == other.entity_id
            && self.state == other.state
            && self.attributes == other.attributes
    }
}

//! Entity state storage with domain indexing for Home Assistant
//!
//! The StateStore holds the last state every entity wrote. Entities never
//! touch it directly: they render themselves and the host writes the result
//! here. Every write and removal is also published to subscribers as a
//! [`StateChanged`] notification.

use dashmap::DashMap;
use ha_core::{Context, EntityId, State};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, instrument, trace};

/// Default capacity of the change notification channel
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Notification published after every write or removal
#[derive(Debug, Clone, Serialize)]
pub struct StateChanged {
    pub entity_id: EntityId,
    pub old_state: Option<State>,
    /// None when the entity was removed
    pub new_state: Option<State>,
}

/// The state store tracks all entity states
pub struct StateStore {
    /// All entity states keyed by entity_id string
    states: DashMap<String, State>,
    /// Index of entity_ids by domain
    domain_index: DashMap<String, Vec<String>>,
    /// Change notifications
    changes: broadcast::Sender<StateChanged>,
}

impl StateStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            states: DashMap::new(),
            domain_index: DashMap::new(),
            changes,
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StateChanged> {
        self.changes.subscribe()
    }

    /// Write the state of an entity
    ///
    /// If the entity already has a state, `last_changed` is only moved when
    /// the value itself differs.
    #[instrument(skip(self, state, attributes, context), fields(entity_id = %entity_id))]
    pub fn set(
        &self,
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> State {
        let key = entity_id.to_string();

        let old_state = self.states.get(&key).map(|s| s.clone());
        let new_state = match &old_state {
            Some(existing) => existing.with_update(state, attributes, context),
            None => State::new(entity_id.clone(), state, attributes, context),
        };

        debug!(
            state = %new_state.state,
            changed = old_state.as_ref().map(|s| s.state != new_state.state).unwrap_or(true),
            "Writing entity state"
        );

        self.states.insert(key.clone(), new_state.clone());

        if old_state.is_none() {
            self.domain_index
                .entry(entity_id.domain().to_string())
                .or_default()
                .push(key);
        }

        // No receivers is not an error
        let _ = self.changes.send(StateChanged {
            entity_id,
            old_state,
            new_state: Some(new_state.clone()),
        });

        new_state
    }

    /// Get the current state of an entity
    pub fn get(&self, entity_id: &str) -> Option<State> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    /// Get the state value as a string, or None if entity doesn't exist
    pub fn get_state(&self, entity_id: &str) -> Option<String> {
        self.states.get(entity_id).map(|s| s.state.clone())
    }

    /// Check if an entity is in a specific state
    pub fn is_state(&self, entity_id: &str, state: &str) -> bool {
        self.get_state(entity_id).as_deref() == Some(state)
    }

    /// Get all entity IDs for a domain, in insertion order
    pub fn entity_ids(&self, domain: &str) -> Vec<String> {
        self.domain_index
            .get(domain)
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// Get all states for a domain
    pub fn domain_states(&self, domain: &str) -> Vec<State> {
        self.entity_ids(domain)
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// Remove an entity's state
    #[instrument(skip(self), fields(entity_id = %entity_id))]
    pub fn remove(&self, entity_id: &EntityId) -> Option<State> {
        let key = entity_id.to_string();
        let old_state = self.states.remove(&key).map(|(_, s)| s);

        if let Some(state) = &old_state {
            trace!("Removing entity state");

            if let Some(mut ids) = self.domain_index.get_mut(entity_id.domain()) {
                ids.retain(|id| id != &key);
            }

            let _ = self.changes.send(StateChanged {
                entity_id: entity_id.clone(),
                old_state: Some(state.clone()),
                new_state: None,
            });
        }

        old_state
    }

    /// Get the total number of entities
    pub fn entity_count(&self) -> usize {
        self.states.len()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for StateStore
pub type SharedStateStore = Arc<StateStore>;

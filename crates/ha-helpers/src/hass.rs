//! Shared host handle

use dashmap::DashMap;
use ha_dispatcher::Dispatcher;
use ha_state_store::StateStore;
use std::any::Any;
use std::sync::Arc;

use crate::entity_registry::EntityRegistry;

/// Cheap-to-clone handle to the host services an integration talks to
#[derive(Clone)]
pub struct HomeAssistant {
    /// Signal dispatcher between device clients and entities
    pub dispatcher: Arc<Dispatcher>,
    /// Entity states
    pub states: Arc<StateStore>,
    /// unique_id → entity_id mapping
    pub entity_registry: Arc<EntityRegistry>,
    /// Per-domain integration data
    pub data: Arc<HassData>,
}

impl HomeAssistant {
    pub fn new() -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new()),
            states: Arc::new(StateStore::new()),
            entity_registry: Arc::new(EntityRegistry::new()),
            data: Arc::new(HassData::new()),
        }
    }
}

impl Default for HomeAssistant {
    fn default() -> Self {
        Self::new()
    }
}

type Slot = Arc<dyn Any + Send + Sync>;

/// Process-wide integration data keyed by (domain, key)
///
/// Integrations store whatever they build during entry setup here, usually
/// keyed by the config entry's unique_id, so their platforms can pick it up.
#[derive(Default)]
pub struct HassData {
    slots: DashMap<(String, String), Slot>,
}

impl HassData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, returning whatever was stored under the same key
    pub fn insert<T: Any + Send + Sync>(
        &self,
        domain: &str,
        key: &str,
        value: Arc<T>,
    ) -> Option<Slot> {
        self.slots
            .insert((domain.to_string(), key.to_string()), value)
    }

    /// Fetch a value of type `T`; None if absent or of another type
    pub fn get<T: Any + Send + Sync>(&self, domain: &str, key: &str) -> Option<Arc<T>> {
        let slot = self
            .slots
            .get(&(domain.to_string(), key.to_string()))
            .map(|s| s.value().clone())?;
        slot.downcast::<T>().ok()
    }

    /// Remove a value of type `T`
    ///
    /// A value of another type is left in place.
    pub fn remove<T: Any + Send + Sync>(&self, domain: &str, key: &str) -> Option<Arc<T>> {
        let id = (domain.to_string(), key.to_string());
        let (_, slot) = self.slots.remove_if(&id, |_, slot| slot.is::<T>())?;
        slot.downcast::<T>().ok()
    }

    /// All keys stored for a domain
    pub fn keys(&self, domain: &str) -> Vec<String> {
        self.slots
            .iter()
            .filter(|r| r.key().0 == domain)
            .map(|r| r.key().1.clone())
            .collect()
    }
}

//! Entity Registry
//!
//! Maps each (domain, platform, unique_id) to a stable entity_id so an
//! entity keeps its ID across entry reloads. Kept in memory only.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ha_core::{slugify, EntityId};
use serde::Serialize;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::entity::DeviceInfo;
use crate::error::EntityResult;

/// A registered entity entry
#[derive(Debug, Clone, Serialize)]
pub struct RegistryEntry {
    pub entity_id: EntityId,
    /// Platform-specific unique identifier
    pub unique_id: String,
    /// Integration that provides this entity (e.g., "bangolufsen")
    pub platform: String,
    /// Config entry that created this entity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_entry_id: Option<String>,
    /// Platform default name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    /// Platform default icon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_icon: Option<String>,
    /// Platform default device class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_device_class: Option<String>,
    /// Device the entity belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
    pub created_at: DateTime<Utc>,
}

type UniqueKey = (String, String, String);

/// In-memory entity registry
pub struct EntityRegistry {
    /// Primary index: entity_id string -> entry
    entities: DashMap<String, RegistryEntry>,
    /// Index: (domain, platform, unique_id) -> entity_id string
    by_unique_id: DashMap<UniqueKey, String>,
    /// Serializes ID allocation so two entities never get the same suffix
    allocate_lock: Mutex<()>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: DashMap::new(),
            by_unique_id: DashMap::new(),
            allocate_lock: Mutex::new(()),
        }
    }

    /// Look up the entity_id registered for a unique_id
    pub fn get_entity_id(&self, domain: &str, platform: &str, unique_id: &str) -> Option<EntityId> {
        let key = (domain.to_string(), platform.to_string(), unique_id.to_string());
        let entity_id = self.by_unique_id.get(&key)?.value().clone();
        self.entities.get(&entity_id).map(|e| e.entity_id.clone())
    }

    /// Get an entry by entity_id
    pub fn get(&self, entity_id: &str) -> Option<RegistryEntry> {
        self.entities.get(entity_id).map(|e| e.value().clone())
    }

    /// Return the existing entry for a unique_id or register a new one
    ///
    /// A new entity_id is derived from `suggested_object_id`; `_2`, `_3`, ...
    /// is appended while the ID is taken by another registered entity or by
    /// `is_taken` (e.g. an unregistered state).
    pub fn get_or_create(
        &self,
        domain: &str,
        platform: &str,
        unique_id: &str,
        suggested_object_id: &str,
        config_entry_id: Option<&str>,
        is_taken: impl Fn(&EntityId) -> bool,
    ) -> EntityResult<RegistryEntry> {
        // Poisoning only means another allocation panicked; the maps are
        // still consistent.
        let _guard = self
            .allocate_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(entity_id) = self.get_entity_id(domain, platform, unique_id) {
            if let Some(entry) = self.get(&entity_id.to_string()) {
                debug!(entity_id = %entity_id, "Reusing registered entity");
                return Ok(entry);
            }
        }

        let base = EntityId::new(domain, slugify(suggested_object_id))?;
        let mut entity_id = base.clone();
        let mut n = 2;
        while self.entities.contains_key(&entity_id.to_string()) || is_taken(&entity_id) {
            entity_id = base.with_suffix(n);
            n += 1;
        }

        let entry = RegistryEntry {
            entity_id: entity_id.clone(),
            unique_id: unique_id.to_string(),
            platform: platform.to_string(),
            config_entry_id: config_entry_id.map(str::to_string),
            original_name: None,
            original_icon: None,
            original_device_class: None,
            device_info: None,
            created_at: Utc::now(),
        };

        self.entities.insert(entity_id.to_string(), entry.clone());
        self.by_unique_id.insert(
            (domain.to_string(), platform.to_string(), unique_id.to_string()),
            entity_id.to_string(),
        );

        info!(entity_id = %entity_id, platform, unique_id, "Registered new entity");
        Ok(entry)
    }

    /// Update an entry in place
    pub fn update(&self, entity_id: &str, f: impl FnOnce(&mut RegistryEntry)) -> Option<RegistryEntry> {
        let mut entry = self.entities.get_mut(entity_id)?;
        f(entry.value_mut());
        Some(entry.value().clone())
    }

    /// Remove an entry
    pub fn remove(&self, entity_id: &str) -> Option<RegistryEntry> {
        let (_, entry) = self.entities.remove(entity_id)?;
        self.by_unique_id.remove(&(
            entry.entity_id.domain().to_string(),
            entry.platform.clone(),
            entry.unique_id.clone(),
        ));
        Some(entry)
    }

    /// All entries created by a config entry
    pub fn entries_for_config_entry(&self, config_entry_id: &str) -> Vec<RegistryEntry> {
        self.entities
            .iter()
            .filter(|e| e.config_entry_id.as_deref() == Some(config_entry_id))
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never(_: &EntityId) -> bool {
        false
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let registry = EntityRegistry::new();
        let first = registry
            .get_or_create("binary_sensor", "bangolufsen", "1-proximity", "Kitchen proximity", Some("e1"), never)
            .unwrap();
        let again = registry
            .get_or_create("binary_sensor", "bangolufsen", "1-proximity", "Renamed", Some("e1"), never)
            .unwrap();

        assert_eq!(first.entity_id.to_string(), "binary_sensor.kitchen_proximity");
        assert_eq!(again.entity_id, first.entity_id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_colliding_names_get_suffix() {
        let registry = EntityRegistry::new();
        let a = registry
            .get_or_create("binary_sensor", "bangolufsen", "1-proximity", "Speaker proximity", None, never)
            .unwrap();
        let b = registry
            .get_or_create("binary_sensor", "bangolufsen", "2-proximity", "Speaker proximity", None, never)
            .unwrap();
        let c = registry
            .get_or_create("binary_sensor", "bangolufsen", "3-proximity", "Speaker proximity", None, |id| {
                id.object_id() == "speaker_proximity_3"
            })
            .unwrap();

        assert_eq!(a.entity_id.object_id(), "speaker_proximity");
        assert_eq!(b.entity_id.object_id(), "speaker_proximity_2");
        assert_eq!(c.entity_id.object_id(), "speaker_proximity_4");
    }

    #[test]
    fn test_same_unique_id_other_platform_is_separate() {
        let registry = EntityRegistry::new();
        registry
            .get_or_create("binary_sensor", "bangolufsen", "x", "X", None, never)
            .unwrap();
        registry
            .get_or_create("binary_sensor", "other", "x", "X", None, never)
            .unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_update_and_remove() {
        let registry = EntityRegistry::new();
        let entry = registry
            .get_or_create("binary_sensor", "bangolufsen", "x", "X", Some("e1"), never)
            .unwrap();
        let key = entry.entity_id.to_string();

        registry.update(&key, |e| e.original_icon = Some("mdi:battery-charging".into()));
        assert_eq!(
            registry.get(&key).unwrap().original_icon.as_deref(),
            Some("mdi:battery-charging")
        );
        assert_eq!(registry.entries_for_config_entry("e1").len(), 1);

        registry.remove(&key).unwrap();
        assert!(registry.is_empty());
        assert!(registry.get_entity_id("binary_sensor", "bangolufsen", "x").is_none());
    }
}

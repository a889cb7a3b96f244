//! Entity Platform
//!
//! One platform exists per (integration, entity domain, config entry), e.g.
//! the `binary_sensor` entities of one `bangolufsen` entry. The platform
//! assigns entity IDs, drives each entity through its lifecycle and writes
//! the initial state.

use ha_core::EntityId;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::entity::{Entity, EntityContext};
use crate::error::{EntityError, EntityResult};
use crate::hass::HomeAssistant;

struct PlatformEntity {
    entity: Arc<dyn Entity>,
    ctx: EntityContext,
    unique_id: Option<String>,
}

pub struct EntityPlatform {
    hass: HomeAssistant,
    /// Entity domain, e.g. "binary_sensor"
    domain: String,
    /// Integration providing the entities, e.g. "bangolufsen"
    platform_name: String,
    config_entry_id: Option<String>,
    /// Added entities keyed by entity_id string, in add order
    entities: Mutex<IndexMap<String, PlatformEntity>>,
}

impl EntityPlatform {
    pub fn new(
        hass: HomeAssistant,
        domain: impl Into<String>,
        platform_name: impl Into<String>,
        config_entry_id: Option<String>,
    ) -> Self {
        Self {
            hass,
            domain: domain.into(),
            platform_name: platform_name.into(),
            config_entry_id,
            entities: Mutex::new(IndexMap::new()),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }

    /// Add entities to the host
    ///
    /// For every entity: optionally refresh it, allocate its entity_id,
    /// call `async_added_to_hass` and write its first state. An entity that
    /// fails any step, or repeats a unique_id already on this platform, is
    /// logged and skipped; the rest are still added. Returns the IDs of the
    /// entities that were added.
    #[instrument(skip_all, fields(domain = %self.domain, platform = %self.platform_name))]
    pub async fn add_entities(
        &self,
        new_entities: Vec<Arc<dyn Entity>>,
        update_before_add: bool,
    ) -> Vec<EntityId> {
        let mut entities = self.entities.lock().await;
        let mut added = Vec::with_capacity(new_entities.len());

        for entity in new_entities {
            let unique_id = entity.unique_id();

            if let Some(uid) = &unique_id {
                if entities.values().any(|e| e.unique_id.as_ref() == Some(uid)) {
                    error!(
                        unique_id = %uid,
                        "Platform {} does not generate unique IDs, ignoring duplicate entity",
                        self.platform_name
                    );
                    continue;
                }
            }

            if update_before_add {
                if let Err(err) = entity.async_update().await {
                    error!(error = %err, "Error updating entity before add, skipping it");
                    continue;
                }
            }

            let entity_id = match self.allocate_entity_id(entity.as_ref(), unique_id.as_deref()) {
                Ok(id) => id,
                Err(err) => {
                    error!(error = %err, "Could not allocate entity_id, skipping entity");
                    continue;
                }
            };

            let ctx = EntityContext::new(self.hass.clone(), entity_id.clone());
            if let Err(err) = entity.async_added_to_hass(&ctx).await {
                error!(entity_id = %entity_id, error = %err, "Error adding entity");
                continue;
            }

            if entity.should_poll() {
                debug!(entity_id = %entity_id, "Entity is polled through EntityPlatform::poll");
            }

            ctx.write_ha_state(entity.as_ref());
            debug!(entity_id = %entity_id, "Added entity");

            entities.insert(
                entity_id.to_string(),
                PlatformEntity {
                    entity,
                    ctx,
                    unique_id,
                },
            );
            added.push(entity_id);
        }

        info!(count = added.len(), "Added entities");
        added
    }

    fn allocate_entity_id(
        &self,
        entity: &dyn Entity,
        unique_id: Option<&str>,
    ) -> EntityResult<EntityId> {
        let states = self.hass.states.clone();
        let is_taken = |id: &EntityId| states.get(&id.to_string()).is_some();

        match unique_id {
            Some(uid) => {
                let suggested = entity.name().unwrap_or_else(|| uid.to_string());
                let entry = self.hass.entity_registry.get_or_create(
                    &self.domain,
                    &self.platform_name,
                    uid,
                    &suggested,
                    self.config_entry_id.as_deref(),
                    is_taken,
                )?;

                self.hass
                    .entity_registry
                    .update(&entry.entity_id.to_string(), |e| {
                        e.original_name = entity.name();
                        e.original_icon = entity.icon();
                        e.original_device_class = entity.device_class();
                        e.device_info = entity.device_info();
                    });
                Ok(entry.entity_id)
            }
            None => {
                let name = entity.name().unwrap_or_else(|| self.platform_name.clone());
                let base = EntityId::from_name(self.domain.clone(), &name)?;
                let mut entity_id = base.clone();
                let mut n = 2;
                while is_taken(&entity_id) {
                    entity_id = base.with_suffix(n);
                    n += 1;
                }
                Ok(entity_id)
            }
        }
    }

    /// Remove one entity: deactivate it and drop its state
    ///
    /// The registry entry is kept so the entity_id survives a reload.
    pub async fn remove_entity(&self, entity_id: &EntityId) -> EntityResult<bool> {
        let removed = self.entities.lock().await.shift_remove(&entity_id.to_string());
        let Some(removed) = removed else {
            return Ok(false);
        };

        let result = removed.entity.async_will_remove_from_hass().await;
        self.hass.states.remove(removed.ctx.entity_id());
        result.map(|()| true)
    }

    /// Remove every entity of this platform
    ///
    /// All entities are torn down even if some fail; the last failure is
    /// returned.
    #[instrument(skip_all, fields(domain = %self.domain, platform = %self.platform_name))]
    pub async fn async_reset(&self) -> EntityResult<()> {
        let drained: Vec<PlatformEntity> = {
            let mut entities = self.entities.lock().await;
            entities.drain(..).map(|(_, e)| e).collect()
        };

        let mut last_error: Option<EntityError> = None;
        for removed in drained.into_iter().rev() {
            if let Err(err) = removed.entity.async_will_remove_from_hass().await {
                warn!(entity_id = %removed.ctx.entity_id(), error = %err, "Error removing entity");
                last_error = Some(err);
            }
            self.hass.states.remove(removed.ctx.entity_id());
        }

        debug!("Platform reset");
        last_error.map_or(Ok(()), Err)
    }

    /// Refresh every polled entity and write its state
    ///
    /// Returns how many entities were refreshed successfully.
    pub async fn poll(&self) -> usize {
        let polled: Vec<(Arc<dyn Entity>, EntityContext)> = self
            .entities
            .lock()
            .await
            .values()
            .filter(|e| e.entity.should_poll())
            .map(|e| (e.entity.clone(), e.ctx.clone()))
            .collect();

        let mut refreshed = 0;
        for (entity, ctx) in polled {
            match entity.async_update().await {
                Ok(()) => {
                    ctx.write_ha_state(entity.as_ref());
                    refreshed += 1;
                }
                Err(err) => warn!(entity_id = %ctx.entity_id(), error = %err, "Polling update failed"),
            }
        }
        refreshed
    }

    /// IDs of the added entities, in add order
    pub async fn entity_ids(&self) -> Vec<EntityId> {
        self.entities
            .lock()
            .await
            .values()
            .map(|e| e.ctx.entity_id().clone())
            .collect()
    }

    pub async fn entity(&self, entity_id: &EntityId) -> Option<Arc<dyn Entity>> {
        self.entities
            .lock()
            .await
            .get(&entity_id.to_string())
            .map(|e| e.entity.clone())
    }

    pub async fn len(&self) -> usize {
        self.entities.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.lock().await.is_empty()
    }
}

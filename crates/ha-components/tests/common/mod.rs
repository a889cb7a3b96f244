//! Shared helpers for the component integration tests

#![allow(dead_code)]

use ha_components::bang_olufsen::{DeviceIdentity, DOMAIN};
use ha_config_entries::ConfigEntry;
use ha_core::EntityId;
use ha_helpers::{Entity, EntityContext, HomeAssistant};
use serde_json::json;
use std::sync::Arc;

pub const SERIAL: &str = "30000001";
pub const TITLE: &str = "Living room";

pub fn identity() -> Arc<DeviceIdentity> {
    Arc::new(DeviceIdentity::new(SERIAL, TITLE))
}

/// Config entry for a speaker with the given capabilities
pub fn mock_entry(serial: &str, title: &str, battery: bool, proximity: bool) -> ConfigEntry {
    ConfigEntry::new(DOMAIN, title)
        .with_unique_id(serial)
        .with_data_value("battery", json!(battery))
        .with_data_value("proximity", json!(proximity))
}

/// Activate an entity under `binary_sensor.{object_id}` without a platform
pub async fn activate(hass: &HomeAssistant, entity: &dyn Entity, object_id: &str) -> EntityContext {
    let entity_id = EntityId::new("binary_sensor", object_id).unwrap();
    let ctx = EntityContext::new(hass.clone(), entity_id);
    entity.async_added_to_hass(&ctx).await.unwrap();
    ctx.write_ha_state(entity);
    ctx
}

/// Assert the state value stored for an entity
pub fn assert_state(hass: &HomeAssistant, entity_id: &str, expected: &str) {
    let state = hass.states.get_state(entity_id);
    assert_eq!(
        state.as_deref(),
        Some(expected),
        "Expected entity {} to be in state '{}', but was {:?}",
        entity_id,
        expected,
        state
    );
}

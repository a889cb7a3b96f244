//! Bang & Olufsen Integration
//!
//! Exposes battery charging and proximity binary sensors for Mozart based
//! Bang & Olufsen speakers. The device client that talks to the speaker
//! lives outside this crate; it publishes decoded notifications on the
//! dispatcher (see [`signals`]) and the sensors pick them up.

pub mod binary_sensor;
pub mod constants;
pub mod identity;
pub mod models;
pub mod signals;

use async_trait::async_trait;
use dashmap::DashMap;
use ha_config_entries::{ConfigEntry, IntegrationHandler};
use ha_core::EntityId;
use ha_helpers::{EntityError, EntityPlatform, HomeAssistant};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::binary_sensor::DOMAIN as BINARY_SENSOR_DOMAIN;

pub use binary_sensor::{BangOlufsenBinarySensor, SensorKind};
pub use constants::DOMAIN;
pub use identity::DeviceIdentity;
pub use models::{BatteryState, NotificationTag};

#[derive(Debug, Error)]
pub enum BangOlufsenError {
    #[error("config entry {0} has no unique_id")]
    MissingUniqueId(String),

    #[error("config entry {0} is not set up")]
    NotSetUp(String),

    #[error(transparent)]
    Entity(#[from] EntityError),
}

/// What entry setup stores in `hass.data` for one device
pub struct BangOlufsenData {
    pub identity: Arc<DeviceIdentity>,
    pub binary_sensors: Vec<Arc<BangOlufsenBinarySensor>>,
}

impl BangOlufsenData {
    /// Build the device's entities from the capabilities in the entry data
    pub fn from_entry(entry: &ConfigEntry) -> Result<Self, BangOlufsenError> {
        let identity = Arc::new(DeviceIdentity::from_entry(entry)?);
        let mut binary_sensors = Vec::new();

        if entry.data_value::<bool>(constants::CONF_BATTERY).unwrap_or(false) {
            binary_sensors.push(BangOlufsenBinarySensor::battery_charging(identity.clone()));
        }
        if entry.data_value::<bool>(constants::CONF_PROXIMITY).unwrap_or(false) {
            binary_sensors.push(BangOlufsenBinarySensor::proximity(identity.clone()));
        }

        Ok(Self {
            identity,
            binary_sensors,
        })
    }
}

/// The integration: owns one binary sensor platform per loaded entry
pub struct BangOlufsenIntegration {
    hass: HomeAssistant,
    platforms: DashMap<String, Arc<EntityPlatform>>,
}

impl BangOlufsenIntegration {
    pub fn new(hass: HomeAssistant) -> Self {
        Self {
            hass,
            platforms: DashMap::new(),
        }
    }

    /// Set up a device: build its entities and add them to the host
    #[instrument(skip_all, fields(entry_id = %entry.entry_id, title = %entry.title))]
    pub async fn async_setup_entry(&self, entry: &ConfigEntry) -> Result<Vec<EntityId>, BangOlufsenError> {
        let data = BangOlufsenData::from_entry(entry)?;
        let key = data.identity.unique_id.clone();
        self.hass.data.insert(DOMAIN, &key, Arc::new(data));

        let platform = Arc::new(EntityPlatform::new(
            self.hass.clone(),
            BINARY_SENSOR_DOMAIN,
            DOMAIN,
            Some(entry.entry_id.clone()),
        ));

        match binary_sensor::async_setup_entry(&self.hass, entry, &platform).await {
            Ok(added) => {
                self.platforms.insert(entry.entry_id.clone(), platform);
                info!(entities = added.len(), "Set up Bang & Olufsen device");
                Ok(added)
            }
            Err(err) => {
                self.hass.data.remove::<BangOlufsenData>(DOMAIN, &key);
                Err(err)
            }
        }
    }

    /// Remove a device's entities and forget its data
    #[instrument(skip_all, fields(entry_id = %entry.entry_id))]
    pub async fn async_unload_entry(&self, entry: &ConfigEntry) -> Result<(), BangOlufsenError> {
        let (_, platform) = self
            .platforms
            .remove(&entry.entry_id)
            .ok_or_else(|| BangOlufsenError::NotSetUp(entry.entry_id.clone()))?;

        let result = platform.async_reset().await;
        if let Some(unique_id) = &entry.unique_id {
            self.hass.data.remove::<BangOlufsenData>(DOMAIN, unique_id);
        }
        if let Err(err) = &result {
            warn!(error = %err, "Error while removing entities");
        }
        result.map_err(Into::into)
    }

    /// Platform of a loaded entry
    pub fn platform(&self, entry_id: &str) -> Option<Arc<EntityPlatform>> {
        self.platforms.get(entry_id).map(|p| p.value().clone())
    }
}

#[async_trait]
impl IntegrationHandler for BangOlufsenIntegration {
    async fn setup_entry(&self, entry: &ConfigEntry) -> Result<(), String> {
        self.async_setup_entry(entry)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn unload_entry(&self, entry: &ConfigEntry) -> Result<(), String> {
        self.async_unload_entry(entry).await.map_err(|e| e.to_string())
    }
}

//! Binary Sensor entities for the Bang & Olufsen integration
//!
//! Both sensors are push-only: they connect to their device's dispatcher
//! signals when added and write their state whenever a notification
//! arrives.

use async_trait::async_trait;
use ha_config_entries::ConfigEntry;
use ha_core::EntityId;
use ha_dispatcher::Unsubscribe;
use ha_helpers::{
    DeviceInfo, Entity, EntityContext, EntityError, EntityLifecycle, EntityPlatform,
    EntityResult, HomeAssistant,
};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, instrument};

use super::constants::{
    WebSocketNotification, DOMAIN, PROXIMITY_PRESENCE_DETECTED, PROXIMITY_PRESENCE_NOT_DETECTED,
};
use super::identity::DeviceIdentity;
use super::models::{BatteryState, NotificationTag};
use super::signals::{connection_status_signal, notification_signal};
use super::{BangOlufsenData, BangOlufsenError};
use crate::binary_sensor::{state_from_is_on, BinarySensorDeviceClass};

/// Set up the binary sensors of a config entry
///
/// The sensors were built by the integration's entry setup and stored in
/// `hass.data`; this only hands them to the platform.
#[instrument(skip_all, fields(entry_id = %entry.entry_id))]
pub async fn async_setup_entry(
    hass: &HomeAssistant,
    entry: &ConfigEntry,
    platform: &EntityPlatform,
) -> Result<Vec<EntityId>, BangOlufsenError> {
    let identity = DeviceIdentity::from_entry(entry)?;
    let data = hass
        .data
        .get::<BangOlufsenData>(DOMAIN, &identity.unique_id)
        .ok_or_else(|| EntityError::MissingData {
            domain: DOMAIN.to_string(),
            key: identity.unique_id.clone(),
        })?;

    let entities: Vec<Arc<dyn Entity>> = data
        .binary_sensors
        .iter()
        .map(|sensor| sensor.clone() as Arc<dyn Entity>)
        .collect();

    Ok(platform.add_entities(entities, true).await)
}

/// Which reading a sensor exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// On while the battery is charging
    BatteryCharging,
    /// On while someone is close to the device
    Proximity,
}

impl SensorKind {
    fn name(&self, device_name: &str) -> String {
        match self {
            Self::BatteryCharging => format!("{device_name} Battery charging"),
            Self::Proximity => format!("{device_name} proximity"),
        }
    }

    fn unique_id(&self, device_id: &str) -> String {
        match self {
            Self::BatteryCharging => format!("{device_id}-battery-charging"),
            Self::Proximity => format!("{device_id}-proximity"),
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            Self::BatteryCharging => "mdi:battery-charging",
            Self::Proximity => "mdi:account-question",
        }
    }

    fn device_class(&self) -> &'static str {
        match self {
            Self::BatteryCharging => BinarySensorDeviceClass::BatteryCharging.as_str(),
            // Not a class the frontend knows; passed through as-is
            Self::Proximity => "proximity",
        }
    }

    fn initial_is_on(&self) -> Option<bool> {
        match self {
            Self::BatteryCharging => None,
            Self::Proximity => Some(false),
        }
    }
}

#[derive(Debug, Clone)]
struct SensorState {
    is_on: Option<bool>,
    available: bool,
    battery: Option<BatteryState>,
    notification: Option<NotificationTag>,
}

struct Subscriptions {
    lifecycle: EntityLifecycle,
    dispatchers: Vec<Unsubscribe>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A binary sensor of one Bang & Olufsen device
pub struct BangOlufsenBinarySensor {
    this: Weak<Self>,
    identity: Arc<DeviceIdentity>,
    kind: SensorKind,
    name: String,
    unique_id: String,
    state: Mutex<SensorState>,
    subscriptions: Mutex<Subscriptions>,
}

impl BangOlufsenBinarySensor {
    pub fn new(identity: Arc<DeviceIdentity>, kind: SensorKind) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            name: kind.name(&identity.name),
            unique_id: kind.unique_id(&identity.unique_id),
            state: Mutex::new(SensorState {
                is_on: kind.initial_is_on(),
                available: true,
                battery: None,
                notification: None,
            }),
            subscriptions: Mutex::new(Subscriptions {
                lifecycle: EntityLifecycle::default(),
                dispatchers: Vec::new(),
            }),
            identity,
            kind,
        })
    }

    pub fn battery_charging(identity: Arc<DeviceIdentity>) -> Arc<Self> {
        Self::new(identity, SensorKind::BatteryCharging)
    }

    pub fn proximity(identity: Arc<DeviceIdentity>) -> Arc<Self> {
        Self::new(identity, SensorKind::Proximity)
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn is_on(&self) -> Option<bool> {
        lock(&self.state).is_on
    }

    pub fn is_available(&self) -> bool {
        lock(&self.state).available
    }

    /// Last battery notification received
    pub fn battery(&self) -> Option<BatteryState> {
        lock(&self.state).battery.clone()
    }

    /// Last proximity notification received, mapped or not
    pub fn notification(&self) -> Option<NotificationTag> {
        lock(&self.state).notification.clone()
    }

    pub fn lifecycle(&self) -> EntityLifecycle {
        lock(&self.subscriptions).lifecycle
    }

    /// Number of dispatcher connections currently held
    pub fn subscription_count(&self) -> usize {
        lock(&self.subscriptions).dispatchers.len()
    }

    fn lifecycle_error(&self, operation: &'static str, state: EntityLifecycle) -> EntityError {
        EntityError::InvalidLifecycle {
            unique_id: self.unique_id.clone(),
            operation,
            state,
        }
    }

    /// Connect `update` to a signal; every decoded payload is applied and
    /// followed by a state write
    fn connect<T>(&self, ctx: &EntityContext, signal: String, update: fn(&Self, T)) -> Unsubscribe
    where
        T: DeserializeOwned + Send + 'static,
    {
        let dispatcher = ctx.hass().dispatcher.clone();
        let this = self.this.clone();
        let ctx = ctx.clone();

        dispatcher.connect_typed(signal, move |payload: T| {
            // Gone means the platform already dropped the entity
            if let Some(sensor) = this.upgrade() {
                update(&sensor, payload);
                ctx.write_ha_state(sensor.as_ref());
            }
            async { Ok(()) }
        })
    }

    fn update_connection_state(&self, connected: bool) {
        lock(&self.state).available = connected;
    }

    fn update_battery_charging(&self, battery: BatteryState) {
        let mut state = lock(&self.state);
        state.is_on = Some(battery.is_charging);
        state.battery = Some(battery);
    }

    fn update_proximity(&self, tag: NotificationTag) {
        let mut state = lock(&self.state);
        match tag.value.as_str() {
            PROXIMITY_PRESENCE_DETECTED => state.is_on = Some(true),
            PROXIMITY_PRESENCE_NOT_DETECTED => state.is_on = Some(false),
            other => debug!(unique_id = %self.unique_id, value = other, "Ignoring unmapped proximity value"),
        }
        state.notification = Some(tag);
    }
}

#[async_trait]
impl Entity for BangOlufsenBinarySensor {
    fn unique_id(&self) -> Option<String> {
        Some(self.unique_id.clone())
    }

    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn icon(&self) -> Option<String> {
        Some(self.kind.icon().to_string())
    }

    fn device_class(&self) -> Option<String> {
        Some(self.kind.device_class().to_string())
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        Some(self.identity.device_info())
    }

    fn should_poll(&self) -> bool {
        false
    }

    fn available(&self) -> bool {
        self.is_available()
    }

    fn state(&self) -> Option<String> {
        state_from_is_on(self.is_on())
    }

    /// Connect to the device's signals
    async fn async_added_to_hass(&self, ctx: &EntityContext) -> EntityResult<()> {
        let mut subscriptions = lock(&self.subscriptions);
        let current = subscriptions.lifecycle;
        let next = current
            .activated()
            .ok_or_else(|| self.lifecycle_error("activate", current))?;

        let device_id = &self.identity.unique_id;
        let notification = match self.kind {
            SensorKind::BatteryCharging => self.connect(
                ctx,
                notification_signal(device_id, WebSocketNotification::Battery),
                Self::update_battery_charging,
            ),
            SensorKind::Proximity => self.connect(
                ctx,
                notification_signal(device_id, WebSocketNotification::Proximity),
                Self::update_proximity,
            ),
        };
        let connection = self.connect(
            ctx,
            connection_status_signal(device_id),
            Self::update_connection_state,
        );

        subscriptions.dispatchers = vec![notification, connection];
        subscriptions.lifecycle = next;
        debug!(entity_id = %ctx.entity_id(), "Connected dispatchers");
        Ok(())
    }

    /// Disconnect every signal connected in `async_added_to_hass`
    async fn async_will_remove_from_hass(&self) -> EntityResult<()> {
        let dispatchers = {
            let mut subscriptions = lock(&self.subscriptions);
            let current = subscriptions.lifecycle;
            subscriptions.lifecycle = current
                .deactivated()
                .ok_or_else(|| self.lifecycle_error("deactivate", current))?;
            std::mem::take(&mut subscriptions.dispatchers)
        };

        for dispatcher in dispatchers {
            dispatcher.call();
        }
        debug!(unique_id = %self.unique_id, "Disconnected dispatchers");
        Ok(())
    }
}

//! Entity trait and the context an added entity writes its state through

use async_trait::async_trait;
use ha_core::attributes::{ATTR_DEVICE_CLASS, ATTR_FRIENDLY_NAME, ATTR_ICON};
use ha_core::{Context, EntityId, State, STATE_UNAVAILABLE, STATE_UNKNOWN};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use tracing::trace;

use crate::error::EntityResult;
use crate::hass::HomeAssistant;

/// Lifecycle of an entity instance
///
/// ```text
/// Constructed → Active → Deactivated
/// ```
///
/// Deactivated is terminal: a removed entity is never added again, the
/// integration builds a new instance instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityLifecycle {
    #[default]
    Constructed,
    Active,
    Deactivated,
}

impl EntityLifecycle {
    /// State after activation, if activation is allowed from here
    pub fn activated(self) -> Option<Self> {
        (self == Self::Constructed).then_some(Self::Active)
    }

    /// State after deactivation, if deactivation is allowed from here
    pub fn deactivated(self) -> Option<Self> {
        (self == Self::Active).then_some(Self::Deactivated)
    }
}

/// Device an entity belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// (domain, identifier) pairs, e.g. `("bangolufsen", "30000001")`
    pub identifiers: BTreeSet<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl DeviceInfo {
    pub fn from_identifier(domain: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            identifiers: BTreeSet::from([(domain.into(), id.into())]),
            ..Default::default()
        }
    }
}

/// An entity as seen by the host
///
/// Getters are read every time the entity's state is written; they should
/// be cheap and never block.
#[async_trait]
pub trait Entity: Send + Sync {
    /// Stable identifier within the platform; entities without one are
    /// not registered in the entity registry
    fn unique_id(&self) -> Option<String>;

    fn name(&self) -> Option<String>;

    fn icon(&self) -> Option<String> {
        None
    }

    fn device_class(&self) -> Option<String> {
        None
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        None
    }

    /// Whether the host should refresh the entity on an interval
    fn should_poll(&self) -> bool {
        true
    }

    fn available(&self) -> bool {
        true
    }

    /// The state value; None renders as `unknown`
    fn state(&self) -> Option<String>;

    fn extra_state_attributes(&self) -> HashMap<String, Value> {
        HashMap::new()
    }

    /// Called once the entity has an entity_id and may subscribe to things
    async fn async_added_to_hass(&self, _ctx: &EntityContext) -> EntityResult<()> {
        Ok(())
    }

    /// Called before the entity is removed; must release what
    /// `async_added_to_hass` acquired
    async fn async_will_remove_from_hass(&self) -> EntityResult<()> {
        Ok(())
    }

    /// Refresh the entity's data
    async fn async_update(&self) -> EntityResult<()> {
        Ok(())
    }
}

/// Render an entity into its state value and attributes
pub fn render_state(entity: &dyn Entity) -> (String, HashMap<String, Value>) {
    let state = if entity.available() {
        entity.state().unwrap_or_else(|| STATE_UNKNOWN.to_string())
    } else {
        STATE_UNAVAILABLE.to_string()
    };

    let mut attributes = entity.extra_state_attributes();
    if let Some(name) = entity.name() {
        attributes.insert(ATTR_FRIENDLY_NAME.to_string(), json!(name));
    }
    if let Some(icon) = entity.icon() {
        attributes.insert(ATTR_ICON.to_string(), json!(icon));
    }
    if let Some(device_class) = entity.device_class() {
        attributes.insert(ATTR_DEVICE_CLASS.to_string(), json!(device_class));
    }

    (state, attributes)
}

/// Handle an added entity uses to reach the host
#[derive(Clone)]
pub struct EntityContext {
    hass: HomeAssistant,
    entity_id: EntityId,
}

impl EntityContext {
    pub fn new(hass: HomeAssistant, entity_id: EntityId) -> Self {
        Self { hass, entity_id }
    }

    pub fn hass(&self) -> &HomeAssistant {
        &self.hass
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// Persist the entity's current state into the state store
    pub fn write_ha_state(&self, entity: &dyn Entity) -> State {
        let (state, attributes) = render_state(entity);
        trace!(entity_id = %self.entity_id, state = %state, "Writing state");
        self.hass
            .states
            .set(self.entity_id.clone(), state, attributes, Context::new())
    }
}

//! Home Assistant integration helpers
//!
//! The host-side pieces an integration is written against:
//!
//! - [`HomeAssistant`] - shared handle to the dispatcher, state store,
//!   entity registry and per-domain integration data
//! - [`Entity`] - what an entity exposes to the host
//! - [`EntityPlatform`] - adds entities, wires their lifecycle and tears
//!   them down again
//! - [`EntityRegistry`] - stable unique_id → entity_id mapping

mod error;
mod hass;

pub mod entity;
pub mod entity_platform;
pub mod entity_registry;

pub use error::{EntityError, EntityResult};
pub use hass::{HassData, HomeAssistant};

pub use entity::{render_state, DeviceInfo, Entity, EntityContext, EntityLifecycle};
pub use entity_platform::EntityPlatform;
pub use entity_registry::{EntityRegistry, RegistryEntry};

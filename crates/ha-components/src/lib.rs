//! Home Assistant Components
//!
//! Entity domains and the integrations that provide entities for them.
//!
//! - [`binary_sensor`] - shared types for on/off entities
//! - [`bang_olufsen`] - binary sensors for Bang & Olufsen speakers

pub mod bang_olufsen;
pub mod binary_sensor;

pub use bang_olufsen::{BangOlufsenBinarySensor, BangOlufsenIntegration};
pub use binary_sensor::BinarySensorDeviceClass;

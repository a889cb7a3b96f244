//! Binary Sensor Component
//!
//! Shared types for entities whose state is either `on` or `off`.

use ha_core::{STATE_OFF, STATE_ON};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DOMAIN: &str = "binary_sensor";

/// Device classes the frontend knows how to render
///
/// Integrations may also pass a free-form string as the device class; it is
/// forwarded to the state attributes unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinarySensorDeviceClass {
    Battery,
    BatteryCharging,
    Connectivity,
    Motion,
    Occupancy,
    Plug,
    Power,
    Presence,
    Problem,
    Running,
    Sound,
    Update,
}

impl BinarySensorDeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Battery => "battery",
            Self::BatteryCharging => "battery_charging",
            Self::Connectivity => "connectivity",
            Self::Motion => "motion",
            Self::Occupancy => "occupancy",
            Self::Plug => "plug",
            Self::Power => "power",
            Self::Presence => "presence",
            Self::Problem => "problem",
            Self::Running => "running",
            Self::Sound => "sound",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for BinarySensorDeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State value for an `is_on` reading; None while the value is unknown
pub fn state_from_is_on(is_on: Option<bool>) -> Option<String> {
    is_on.map(|on| if on { STATE_ON } else { STATE_OFF }.to_string())
}

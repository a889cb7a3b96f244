//! Constants shared by the Bang & Olufsen integration

use std::fmt;

pub const DOMAIN: &str = "bangolufsen";

/// Signal suffix for the device's reachability
pub const CONNECTION_STATUS: &str = "connection_status";

/// Key under which entry data enables the battery charging sensor
pub const CONF_BATTERY: &str = "battery";

/// Key under which entry data enables the proximity sensor
pub const CONF_PROXIMITY: &str = "proximity";

pub const MANUFACTURER: &str = "Bang & Olufsen";

/// Notification value for a person close to the device
pub const PROXIMITY_PRESENCE_DETECTED: &str = "proximityPresenceDetected";

/// Notification value for nobody close to the device
pub const PROXIMITY_PRESENCE_NOT_DETECTED: &str = "proximityPresenceNotDetected";

/// WebSocket notifications forwarded to entities, by signal suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebSocketNotification {
    Battery,
    Proximity,
}

impl WebSocketNotification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Battery => "battery",
            Self::Proximity => "proximity",
        }
    }
}

impl fmt::Display for WebSocketNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

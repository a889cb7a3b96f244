//! Per-device identity

use ha_config_entries::ConfigEntry;
use ha_helpers::DeviceInfo;

use super::constants::{DOMAIN, MANUFACTURER};
use super::BangOlufsenError;

/// The (unique id, name) pair every entity of a device derives from
///
/// Built once per config entry and shared read-only by all of the
/// device's entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Device serial number, also the config entry's unique_id
    pub unique_id: String,
    /// Display name, the config entry's title
    pub name: String,
}

impl DeviceIdentity {
    pub fn new(unique_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            name: name.into(),
        }
    }

    /// Identity of the device a config entry describes
    pub fn from_entry(entry: &ConfigEntry) -> Result<Self, BangOlufsenError> {
        let unique_id = entry
            .unique_id
            .clone()
            .ok_or_else(|| BangOlufsenError::MissingUniqueId(entry.entry_id.clone()))?;
        Ok(Self::new(unique_id, entry.title.clone()))
    }

    /// Device registry info entities attach to
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: Some(self.name.clone()),
            manufacturer: Some(MANUFACTURER.to_string()),
            ..DeviceInfo::from_identifier(DOMAIN, self.unique_id.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_entry() {
        let entry = ConfigEntry::new(DOMAIN, "Beosound Balance").with_unique_id("30000001");
        let identity = DeviceIdentity::from_entry(&entry).unwrap();

        assert_eq!(identity, DeviceIdentity::new("30000001", "Beosound Balance"));
        assert!(identity
            .device_info()
            .identifiers
            .contains(&(DOMAIN.to_string(), "30000001".to_string())));
    }

    #[test]
    fn test_entry_without_unique_id() {
        let entry = ConfigEntry::new(DOMAIN, "Beosound Balance");
        assert!(matches!(
            DeviceIdentity::from_entry(&entry),
            Err(BangOlufsenError::MissingUniqueId(_))
        ));
    }
}

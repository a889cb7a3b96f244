//! Typed host configuration
//!
//! ```yaml
//! homeassistant:
//!   name: Home
//!
//! logger:
//!   default: info
//!   logs:
//!     ha_components: debug
//!
//! bang_olufsen:
//!   - serial: "30000001"
//!     name: Living room
//!     host: !secret living_room_host
//!     battery: true
//!     proximity: true
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::loader::load_yaml;

pub const CONFIG_FILE: &str = "configuration.yaml";

/// The `homeassistant:` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_name() -> String {
    "Home".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
        }
    }
}

/// The `logger:` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Level for everything not listed in `logs`
    #[serde(default)]
    pub default: Option<String>,
    /// Per-target levels, e.g. `ha_components: debug`
    #[serde(default)]
    pub logs: BTreeMap<String, String>,
}

impl LoggerConfig {
    /// Directives in `tracing_subscriber::EnvFilter` syntax
    pub fn filter_directives(&self) -> String {
        let default = self.default.as_deref().unwrap_or("info");
        std::iter::once(default.to_string())
            .chain(self.logs.iter().map(|(target, level)| format!("{target}={level}")))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// One speaker under `bang_olufsen:`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Serial number; becomes the config entry's unique_id
    pub serial: String,
    pub name: String,
    /// Address of the speaker, used by the device client
    #[serde(default)]
    pub host: Option<String>,
    /// The speaker has a battery
    #[serde(default)]
    pub battery: bool,
    /// The speaker has a proximity sensor
    #[serde(default)]
    pub proximity: bool,
}

/// Everything the host reads from `configuration.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub homeassistant: CoreConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
    #[serde(default)]
    pub bang_olufsen: Vec<DeviceConfig>,
}

impl HostConfig {
    /// Load `configuration.yaml` from a config directory
    pub fn load(config_dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let yaml = load_yaml(config_dir.as_ref(), CONFIG_FILE)?;
        Self::from_yaml(yaml)
    }

    /// Parse an already loaded configuration, ignoring unknown sections
    pub fn from_yaml(yaml: Value) -> ConfigResult<Self> {
        let yaml = match yaml {
            // An empty file
            Value::Null => return Ok(Self::default()),
            v @ Value::Mapping(_) => v,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "root".to_string(),
                    reason: "configuration must be a mapping".to_string(),
                })
            }
        };

        let config: Self = serde_yaml::from_value(yaml).map_err(|e| ConfigError::InvalidValue {
            key: "root".to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for device in &self.bang_olufsen {
            if device.serial.trim().is_empty() {
                return Err(ConfigError::ValidationFailed {
                    message: format!("bang_olufsen device '{}' has an empty serial", device.name),
                });
            }
            if !seen.insert(device.serial.as_str()) {
                return Err(ConfigError::ValidationFailed {
                    message: format!("bang_olufsen serial '{}' is configured twice", device.serial),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(yaml: &str) -> ConfigResult<HostConfig> {
        HostConfig::from_yaml(serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn test_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.homeassistant.name, "Home");
        assert!(config.bang_olufsen.is_empty());
        assert_eq!(config.logger.filter_directives(), "info");
    }

    #[test]
    fn test_devices() {
        let config = parse(
            r#"
bang_olufsen:
  - serial: "30000001"
    name: Living room
    battery: true
  - serial: "30000002"
    name: Kitchen
    proximity: true
automation: []
"#,
        )
        .unwrap();

        assert_eq!(config.bang_olufsen.len(), 2);
        let living_room = &config.bang_olufsen[0];
        assert!(living_room.battery && !living_room.proximity);
        assert_eq!(living_room.host, None);
        assert!(config.bang_olufsen[1].proximity);
    }

    #[test]
    fn test_duplicate_serial_rejected() {
        let result = parse(
            r#"
bang_olufsen:
  - serial: "1"
    name: A
  - serial: "1"
    name: B
"#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }

    #[test]
    fn test_core_section() {
        let config = parse("homeassistant:\n  name: Summer house\n  time_zone: Europe/Copenhagen\n").unwrap();
        assert_eq!(config.homeassistant.name, "Summer house");
    }

    #[test]
    fn test_root_must_be_mapping() {
        assert!(matches!(parse("- a\n- b\n"), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_logger_directives() {
        let config = parse(
            r#"
logger:
  default: warn
  logs:
    ha_components: debug
    ha_dispatcher: trace
"#,
        )
        .unwrap();
        assert_eq!(
            config.logger.filter_directives(),
            "warn,ha_components=debug,ha_dispatcher=trace"
        );
    }

    #[test]
    fn test_load_with_secret() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("secrets.yaml"), "kitchen_serial: \"30000002\"\n").unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "bang_olufsen:\n  - serial: !secret kitchen_serial\n    name: Kitchen\n",
        )
        .unwrap();

        let config = HostConfig::load(dir.path()).unwrap();
        assert_eq!(config.bang_olufsen[0].serial, "30000002");
    }
}

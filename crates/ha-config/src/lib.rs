//! YAML configuration loading for Home Assistant
//!
//! Reads `configuration.yaml` from a config directory, resolving the
//! custom tags:
//!
//! - `!include path` - Include another YAML file
//! - `!secret key` - Substitute from secrets.yaml
//! - `!env_var VAR` - Environment variable substitution
//!
//! and types the sections the host understands into [`HostConfig`].
//!
//! # Example
//!
//! ```ignore
//! use ha_config::HostConfig;
//!
//! let config = HostConfig::load("/config")?;
//! for device in &config.bang_olufsen {
//!     println!("{} ({})", device.name, device.serial);
//! }
//! ```

mod error;
mod host_config;
mod loader;
mod secrets;

pub use error::{ConfigError, ConfigResult};
pub use host_config::{CoreConfig, DeviceConfig, HostConfig, LoggerConfig, CONFIG_FILE};
pub use loader::{load_yaml, YamlLoader};
pub use secrets::Secrets;

pub use serde_yaml::Value;

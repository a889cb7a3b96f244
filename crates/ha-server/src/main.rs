//! Home Assistant Rust Server
//!
//! Loads `configuration.yaml`, creates one config entry per configured
//! speaker and runs until interrupted.
//!
//! Usage: `homeassistant [CONFIG_DIR]` (default: `$HA_CONFIG_DIR` or `config`)

use anyhow::{Context, Result};
use ha_components::bang_olufsen::{self, BangOlufsenIntegration};
use ha_config::{DeviceConfig, HostConfig};
use ha_config_entries::{ConfigEntries, ConfigEntry, ConfigEntrySource};
use ha_helpers::HomeAssistant;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

fn config_dir() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HA_CONFIG_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config"))
}

/// Config entry describing one configured speaker
fn device_entry(device: &DeviceConfig) -> ConfigEntry {
    let mut entry = ConfigEntry::new(bang_olufsen::DOMAIN, device.name.clone())
        .with_unique_id(device.serial.clone())
        .with_source(ConfigEntrySource::Import)
        .with_data_value(bang_olufsen::constants::CONF_BATTERY, json!(device.battery))
        .with_data_value(bang_olufsen::constants::CONF_PROXIMITY, json!(device.proximity));
    if let Some(host) = &device.host {
        entry = entry.with_data_value("host", json!(host));
    }
    entry
}

/// Log every state write at debug level
fn spawn_state_logger(hass: &HomeAssistant) {
    let mut changes = hass.states.subscribe();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => debug!(
                    entity_id = %change.entity_id,
                    state = change.new_state.as_ref().map(|s| s.state.as_str()).unwrap_or("<removed>"),
                    "State changed"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "State logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_dir = config_dir();
    let config = HostConfig::load(&config_dir)
        .with_context(|| format!("loading configuration from {}", config_dir.display()))?;

    // RUST_LOG wins over the logger section
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.logger.filter_directives())?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(name = %config.homeassistant.name, "Starting Home Assistant (Rust)");

    let hass = HomeAssistant::new();
    spawn_state_logger(&hass);

    let entries = ConfigEntries::new();
    entries.register_integration(
        bang_olufsen::DOMAIN,
        Arc::new(BangOlufsenIntegration::new(hass.clone())),
    );
    for device in &config.bang_olufsen {
        entries.add(device_entry(device))?;
    }

    for (entry_id, result) in entries.setup_all().await {
        if let Err(err) = result {
            error!(entry_id = %entry_id, error = %err, "Config entry setup failed");
        }
    }
    info!(
        entries = entries.len(),
        entities = hass.states.entity_count(),
        "Home Assistant is running"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    for (entry_id, result) in entries.unload_all().await {
        if let Err(err) = result {
            warn!(entry_id = %entry_id, error = %err, "Config entry unload failed");
        }
    }

    Ok(())
}

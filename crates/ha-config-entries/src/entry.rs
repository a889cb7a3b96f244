//! Config Entry types
//!
//! A ConfigEntry represents a single instance of an integration's configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::state_machine::InvalidTransition;

/// Config entry lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntryState {
    /// Initial state, not yet set up
    #[default]
    NotLoaded,
    /// Integration setup is running
    SetupInProgress,
    /// Successfully set up
    Loaded,
    /// Setup failed
    SetupError,
    /// Integration unload is running
    UnloadInProgress,
    /// Unload failed (not recoverable)
    FailedUnload,
}

impl ConfigEntryState {
    /// Check if the entry can be unloaded/reloaded from this state
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConfigEntryState::Loaded | ConfigEntryState::SetupError | ConfigEntryState::NotLoaded
        )
    }
}

/// Where the config entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntrySource {
    /// Created at runtime through the API
    #[default]
    User,
    /// Imported from YAML config
    Import,
    /// mDNS/Bonjour discovery
    Zeroconf,
}

/// A configuration entry for an integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Unique identifier (ULID)
    pub entry_id: String,

    /// Integration domain (e.g., "bangolufsen")
    pub domain: String,

    /// Human-readable display name
    pub title: String,

    /// Immutable configuration data
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,

    /// User-configurable options
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,

    /// Device-level unique identifier, also used for duplicate prevention
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    /// Origin type
    #[serde(default)]
    pub source: ConfigEntrySource,

    /// Current lifecycle state (not persisted)
    #[serde(skip, default)]
    pub state: ConfigEntryState,

    /// Human-readable explanation for failed states
    #[serde(skip, default)]
    pub reason: Option<String>,

    /// Entry is configured but must not be set up
    #[serde(default)]
    pub disabled: bool,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ConfigEntry {
    /// Create a new config entry
    pub fn new(domain: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            entry_id: ulid::Ulid::new().to_string(),
            domain: domain.into(),
            title: title.into(),
            data: HashMap::new(),
            options: HashMap::new(),
            unique_id: None,
            source: ConfigEntrySource::User,
            state: ConfigEntryState::NotLoaded,
            reason: None,
            disabled: false,
            created_at: Utc::now(),
        }
    }

    /// Set entry data
    pub fn with_data(mut self, data: HashMap<String, serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    /// Set a single data key
    pub fn with_data_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Set unique_id
    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    /// Set source
    pub fn with_source(mut self, source: ConfigEntrySource) -> Self {
        self.source = source;
        self
    }

    /// Mark the entry as disabled
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Read a data key as a typed value
    pub fn data_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Check if entry is loaded
    pub fn is_loaded(&self) -> bool {
        self.state == ConfigEntryState::Loaded
    }

    /// Attempt to transition to a new state with validation.
    ///
    /// On success, updates the state and reason fields.
    pub fn try_set_state(
        &mut self,
        new_state: ConfigEntryState,
        reason: Option<String>,
    ) -> Result<(), InvalidTransition> {
        self.state = self.state.try_transition(new_state)?;
        self.reason = reason;
        Ok(())
    }
}

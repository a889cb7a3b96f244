//! Config Entries Manager
//!
//! Manages the lifecycle of configuration entries and hands them to the
//! integration registered for their domain.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::entry::{ConfigEntry, ConfigEntryState};
use crate::state_machine::InvalidTransition;

/// Config entries errors
#[derive(Debug, Error)]
pub enum ConfigEntriesError {
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry already exists for domain {domain} with unique_id {unique_id}")]
    AlreadyExists { domain: String, unique_id: String },

    #[error("Cannot unload entry in state {0:?}")]
    CannotUnload(ConfigEntryState),

    #[error("No integration registered for domain {0}")]
    NoIntegration(String),

    #[error("Setup failed: {0}")]
    SetupFailed(String),

    #[error("Unload failed: {0}")]
    UnloadFailed(String),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

pub type ConfigEntriesResult<T> = Result<T, ConfigEntriesError>;

/// Entry points an integration exposes to the config entry manager
#[async_trait]
pub trait IntegrationHandler: Send + Sync {
    /// Set up everything the entry describes (entities, connections)
    async fn setup_entry(&self, entry: &ConfigEntry) -> Result<(), String>;

    /// Tear down everything `setup_entry` created
    async fn unload_entry(&self, entry: &ConfigEntry) -> Result<(), String>;
}

/// Config Entries Manager
pub struct ConfigEntries {
    /// Primary index: entry_id -> ConfigEntry
    entries: DashMap<String, ConfigEntry>,

    /// Index: domain -> set of entry_ids
    by_domain: DashMap<String, HashSet<String>>,

    /// Index: (domain, unique_id) -> entry_id
    by_unique_id: DashMap<(String, String), String>,

    /// Serializes setup/unload across entries
    setup_lock: Mutex<()>,

    /// Integrations by domain
    integrations: DashMap<String, Arc<dyn IntegrationHandler>>,
}

impl ConfigEntries {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            by_domain: DashMap::new(),
            by_unique_id: DashMap::new(),
            setup_lock: Mutex::new(()),
            integrations: DashMap::new(),
        }
    }

    /// Register the integration that handles entries of `domain`
    pub fn register_integration(&self, domain: &str, handler: Arc<dyn IntegrationHandler>) {
        self.integrations.insert(domain.to_string(), handler);
        debug!("Registered integration for domain: {}", domain);
    }

    fn index_entry(&self, entry: &ConfigEntry) {
        self.entries.insert(entry.entry_id.clone(), entry.clone());

        self.by_domain
            .entry(entry.domain.clone())
            .or_default()
            .insert(entry.entry_id.clone());

        if let Some(ref unique_id) = entry.unique_id {
            self.by_unique_id.insert(
                (entry.domain.clone(), unique_id.clone()),
                entry.entry_id.clone(),
            );
        }
    }

    fn unindex_entry(&self, entry: &ConfigEntry) {
        if let Some(mut ids) = self.by_domain.get_mut(&entry.domain) {
            ids.remove(&entry.entry_id);
        }
        if let Some(ref unique_id) = entry.unique_id {
            self.by_unique_id
                .remove(&(entry.domain.clone(), unique_id.clone()));
        }
        self.entries.remove(&entry.entry_id);
    }

    /// Get an entry by ID
    pub fn get(&self, entry_id: &str) -> Option<ConfigEntry> {
        self.entries.get(entry_id).map(|r| r.value().clone())
    }

    /// Get all entries for a domain
    pub fn get_by_domain(&self, domain: &str) -> Vec<ConfigEntry> {
        self.by_domain
            .get(domain)
            .map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    /// Get entry by unique_id
    pub fn get_by_unique_id(&self, domain: &str, unique_id: &str) -> Option<ConfigEntry> {
        self.by_unique_id
            .get(&(domain.to_string(), unique_id.to_string()))
            .and_then(|entry_id| self.get(&entry_id))
    }

    /// Add a new config entry
    pub fn add(&self, entry: ConfigEntry) -> ConfigEntriesResult<ConfigEntry> {
        if let Some(ref unique_id) = entry.unique_id {
            if self.get_by_unique_id(&entry.domain, unique_id).is_some() {
                return Err(ConfigEntriesError::AlreadyExists {
                    domain: entry.domain.clone(),
                    unique_id: unique_id.clone(),
                });
            }
        }

        self.index_entry(&entry);
        info!(
            "Added config entry: {} ({}) [{}]",
            entry.title, entry.domain, entry.entry_id
        );
        Ok(entry)
    }

    /// Remove an entry, unloading it first if it is loaded
    pub async fn remove(&self, entry_id: &str) -> ConfigEntriesResult<ConfigEntry> {
        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        if entry.is_loaded() {
            self.unload(entry_id).await?;
        }

        self.unindex_entry(&entry);
        info!(
            "Removed config entry: {} ({}) [{}]",
            entry.title, entry.domain, entry_id
        );
        Ok(entry)
    }

    fn transition(
        &self,
        entry_id: &str,
        state: ConfigEntryState,
        reason: Option<String>,
    ) -> ConfigEntriesResult<ConfigEntry> {
        let mut entry = self
            .entries
            .get_mut(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;
        entry.try_set_state(state, reason)?;
        debug!("Entry {} state changed to {:?}", entry_id, state);
        Ok(entry.clone())
    }

    fn integration_for(&self, domain: &str) -> ConfigEntriesResult<Arc<dyn IntegrationHandler>> {
        self.integrations
            .get(domain)
            .map(|h| h.value().clone())
            .ok_or_else(|| ConfigEntriesError::NoIntegration(domain.to_string()))
    }

    /// Set up an entry through its integration
    pub async fn setup(&self, entry_id: &str) -> ConfigEntriesResult<()> {
        let _lock = self.setup_lock.lock().await;

        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        if entry.disabled {
            debug!("Skipping setup for disabled entry: {}", entry_id);
            return Ok(());
        }

        let handler = self.integration_for(&entry.domain)?;
        let entry = self.transition(entry_id, ConfigEntryState::SetupInProgress, None)?;

        match handler.setup_entry(&entry).await {
            Ok(()) => {
                self.transition(entry_id, ConfigEntryState::Loaded, None)?;
                info!("Setup completed for entry: {} ({})", entry.title, entry_id);
                Ok(())
            }
            Err(reason) => {
                warn!("Setup failed for entry {}: {}", entry_id, reason);
                self.transition(entry_id, ConfigEntryState::SetupError, Some(reason.clone()))?;
                Err(ConfigEntriesError::SetupFailed(reason))
            }
        }
    }

    /// Unload an entry through its integration
    pub async fn unload(&self, entry_id: &str) -> ConfigEntriesResult<()> {
        let _lock = self.setup_lock.lock().await;

        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        match entry.state {
            ConfigEntryState::NotLoaded => return Ok(()),
            state if !state.is_recoverable() => {
                return Err(ConfigEntriesError::CannotUnload(state))
            }
            _ => {}
        }

        let was_loaded = entry.is_loaded();
        let entry = self.transition(entry_id, ConfigEntryState::UnloadInProgress, None)?;

        // A failed setup left nothing behind to tear down
        let result = if was_loaded {
            let handler = self.integration_for(&entry.domain)?;
            handler.unload_entry(&entry).await
        } else {
            Ok(())
        };

        match result {
            Ok(()) => {
                self.transition(entry_id, ConfigEntryState::NotLoaded, None)?;
                info!("Unloaded entry: {} ({})", entry.title, entry_id);
                Ok(())
            }
            Err(reason) => {
                warn!("Unload failed for entry {}: {}", entry_id, reason);
                self.transition(entry_id, ConfigEntryState::FailedUnload, Some(reason.clone()))?;
                Err(ConfigEntriesError::UnloadFailed(reason))
            }
        }
    }

    /// Reload an entry (unload + setup)
    pub async fn reload(&self, entry_id: &str) -> ConfigEntriesResult<()> {
        self.unload(entry_id).await?;
        self.setup(entry_id).await
    }

    /// Get all entry IDs
    pub fn entry_ids(&self) -> Vec<String> {
        self.entries.iter().map(|r| r.key().clone()).collect()
    }

    /// Get count of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Set up all entries, returning one result per entry
    pub async fn setup_all(&self) -> Vec<(String, ConfigEntriesResult<()>)> {
        let mut results = Vec::new();
        for entry_id in self.entry_ids() {
            let result = self.setup(&entry_id).await;
            results.push((entry_id, result));
        }
        results
    }

    /// Unload all loaded entries
    pub async fn unload_all(&self) -> Vec<(String, ConfigEntriesResult<()>)> {
        let mut results = Vec::new();
        for entry_id in self.entry_ids() {
            let result = self.unload(&entry_id).await;
            results.push((entry_id, result));
        }
        results
    }
}

impl Default for ConfigEntries {
    fn default() -> Self {
        Self::new()
    }
}

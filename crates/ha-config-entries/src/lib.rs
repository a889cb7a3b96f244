//! Config Entries
//!
//! Config entries represent individual integration instances (one per
//! configured device) and manage their lifecycle: setup, unload, reload.
//!
//! # Key Types
//!
//! - [`ConfigEntry`] - A single integration configuration
//! - [`ConfigEntryState`] - Lifecycle state of an entry
//! - [`ConfigEntries`] - Manager for all config entries
//! - [`IntegrationHandler`] - What an integration implements to be set up
//!
//! Entries live in memory only; they are rebuilt from the host
//! configuration at every start.

pub mod entry;
pub mod manager;
pub mod state_machine;

pub use entry::{ConfigEntry, ConfigEntrySource, ConfigEntryState};

pub use manager::{ConfigEntries, ConfigEntriesError, ConfigEntriesResult, IntegrationHandler};

pub use state_machine::InvalidTransition;

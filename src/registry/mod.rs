//! Source registry module for feeder.
//!
//! This module keeps the persistent, versioned list of feed sources: loading
//! and migrating the source list file, saving it with backups, and adding,
//! deleting, listing and refreshing sources.

pub mod confirm;
pub mod persist;
pub mod schema;
pub mod service;

pub use confirm::{AlwaysConfirm, Confirm, NeverConfirm, Selection};
pub use persist::{backup_path, create_backup, versioned_backup_path, write_atomic};
pub use schema::{SchemaVersion, SourceListFile, VersionedSourceList, CURRENT_VERSION};
pub use service::{
    format_entry, AddSources, RefreshSettings, RefreshSummary, RegistryInfo, RegistryState,
    SourceRegistry, UNSAVED_PROMPT,
};

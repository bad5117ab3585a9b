//! JSON-file persistence for the in-memory store.
//!
//! The whole store (records, mappings, user aggregates) round-trips through
//! one JSON document. Commands load it at start and save it back after any
//! mutation.

use std::fs;
use std::path::Path;

use anyhow::Context;
use sheetdrop_core::MemoryStore;
use tracing::debug;

/// Load the store from the state file, or start empty if it does not exist.
pub fn load(path: &Path) -> anyhow::Result<MemoryStore> {
    if !path.exists() {
        debug!("no state file at {}, starting empty", path.display());
        return Ok(MemoryStore::new());
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    MemoryStore::from_json(&data)
        .with_context(|| format!("state file {} is not valid", path.display()))
}

/// Save the store back to the state file.
pub fn save(store: &MemoryStore, path: &Path) -> anyhow::Result<()> {
    let json = store.to_json()?;
    fs::write(path, json)
        .with_context(|| format!("failed to write state file {}", path.display()))?;
    debug!("saved state to {}", path.display());
    Ok(())
}

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::storage::{KEY_SELECTED_CHAIN, KEY_SELECTED_ENDPOINT, KeyValueStore, load_json, save_json};

/// Last chain and endpoint the user worked with.
///
/// Each field lives under its own storage key so that updating one never
/// clobbers the other. The chain is kept in its textual selection form
/// (`evm:1`, `solana:mainnet-beta`) so this crate stays chain-agnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub selected_chain: Option<String>,
    pub selected_endpoint: Option<String>,
}

impl SessionState {
    /// Load session state. Missing or corrupt values come back as `None`.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            selected_chain: load_json(store, KEY_SELECTED_CHAIN),
            selected_endpoint: load_json(store, KEY_SELECTED_ENDPOINT),
        }
    }

    /// Persist both fields. `None` removes the stored value.
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        Self::put(store, KEY_SELECTED_CHAIN, self.selected_chain.as_deref())?;
        Self::put(store, KEY_SELECTED_ENDPOINT, self.selected_endpoint.as_deref())
    }

    // -- Convenience helpers ------------------------------------------------

    /// Persist only the selected chain.
    pub fn save_selected_chain(store: &dyn KeyValueStore, chain: Option<&str>) -> Result<()> {
        Self::put(store, KEY_SELECTED_CHAIN, chain)
    }

    /// Persist only the selected endpoint URL.
    pub fn save_selected_endpoint(store: &dyn KeyValueStore, url: Option<&str>) -> Result<()> {
        Self::put(store, KEY_SELECTED_ENDPOINT, url)
    }

    fn put(store: &dyn KeyValueStore, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(v) => save_json(store, key, v),
            None => store.remove(key),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

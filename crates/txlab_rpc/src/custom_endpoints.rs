//! User-added endpoints, persisted as an overlay on the compiled-in registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use txlab_chain::{ChainSelection, RpcEndpoint, all_endpoints};
use txlab_core::error::ToolboxError;
use txlab_core::storage::{KEY_CUSTOM_ENDPOINTS, KeyValueStore, load_json, save_json};

/// Selection key (`evm:1`) to the endpoints the user added for it.
pub type CustomEndpointMap = HashMap<String, Vec<RpcEndpoint>>;

/// Every operation re-reads the store, so concurrent handles never work
/// from a stale copy.
#[derive(Clone)]
pub struct CustomEndpointStore {
    store: Arc<dyn KeyValueStore>,
}

impl CustomEndpointStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn all(&self) -> CustomEndpointMap {
        load_json(self.store.as_ref(), KEY_CUSTOM_ENDPOINTS)
    }

    pub fn list(&self, selection: &ChainSelection) -> Vec<RpcEndpoint> {
        self.all().remove(&selection.to_string()).unwrap_or_default()
    }

    /// Persist `endpoint`. Its URL must not match any public or custom
    /// endpoint of the selection.
    pub fn add(&self, selection: &ChainSelection, endpoint: RpcEndpoint) -> Result<(), ToolboxError> {
        let mut map = self.all();
        let key = selection.to_string();
        let custom = map.entry(key).or_default();

        if all_endpoints(selection, custom.as_slice())
            .iter()
            .any(|existing| existing.url == endpoint.url)
        {
            return Err(ToolboxError::validation("This RPC endpoint already exists"));
        }

        info!(chain = %selection, endpoint = %endpoint.url, "Adding custom endpoint");
        custom.push(endpoint);
        save_json(self.store.as_ref(), KEY_CUSTOM_ENDPOINTS, &map)?;
        Ok(())
    }

    /// Remove the custom endpoint with `url`. Returns whether one existed.
    pub fn remove(&self, selection: &ChainSelection, url: &str) -> Result<bool, ToolboxError> {
        let mut map = self.all();
        let key = selection.to_string();
        let Some(custom) = map.get_mut(&key) else {
            return Ok(false);
        };
        let before = custom.len();
        custom.retain(|e| e.url != url);
        if custom.len() == before {
            return Ok(false);
        }
        if custom.is_empty() {
            map.remove(&key);
        }

        info!(chain = %selection, endpoint = %url, "Removed custom endpoint");
        save_json(self.store.as_ref(), KEY_CUSTOM_ENDPOINTS, &map)?;
        Ok(true)
    }
}

//! Bounded, persisted log of dispatched RPC calls.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use txlab_chain::{ChainFamily, NetworkId};
use txlab_core::storage::{KeyValueStore, load_json, save_json};

pub const DEFAULT_HISTORY_LIMIT: usize = txlab_core::config::MAX_HISTORY_LIMIT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallHistoryItem {
    pub id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub chain_id: NetworkId,
    pub rpc_url: String,
    pub method: String,
    pub params: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl CallHistoryItem {
    pub fn new(
        chain_id: NetworkId,
        rpc_url: impl Into<String>,
        method: impl Into<String>,
        params: Vec<Value>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            chain_id,
            rpc_url: rpc_url.into(),
            method: method.into(),
            params,
            response: None,
            error: None,
            duration: None,
        }
    }

    pub fn with_response(mut self, response: Value, duration_ms: u64) -> Self {
        self.response = Some(response);
        self.duration = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>, duration_ms: u64) -> Self {
        self.error = Some(error.into());
        self.duration = Some(duration_ms);
        self
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Most-recent-first call log for one chain family.
///
/// Each operation re-reads the store before writing, so two handles on the
/// same store never lose each other's entries.
#[derive(Clone)]
pub struct CallHistory {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    limit: usize,
}

impl CallHistory {
    pub fn new(store: Arc<dyn KeyValueStore>, family: ChainFamily) -> Self {
        Self {
            store,
            key: family.history_storage_key(),
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Lower the cap. It never exceeds [`DEFAULT_HISTORY_LIMIT`].
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, DEFAULT_HISTORY_LIMIT);
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn items(&self) -> Vec<CallHistoryItem> {
        let mut items: Vec<CallHistoryItem> = load_json(self.store.as_ref(), self.key);
        items.truncate(self.limit);
        items
    }

    /// Insert at the front, dropping the oldest entries beyond the limit.
    pub fn push(&self, item: CallHistoryItem) -> Result<()> {
        let mut items = self.items();
        items.insert(0, item);
        items.truncate(self.limit);
        save_json(self.store.as_ref(), self.key, &items)
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut items = self.items();
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return Ok(false);
        }
        save_json(self.store.as_ref(), self.key, &items)?;
        debug!(id, "Deleted call history entry");
        Ok(true)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use txlab_core::storage::{FileStore, KEY_CALL_HISTORY, MemoryStore};

    fn item(method: &str) -> CallHistoryItem {
        CallHistoryItem::new(NetworkId::Chain(1), "https://rpc.test", method, vec![])
            .with_response(json!({"result": "0x1"}), 12)
    }

    #[test]
    fn newest_first_and_capped() {
        let history = CallHistory::new(Arc::new(MemoryStore::new()), ChainFamily::Evm);
        for i in 0..55 {
            history.push(item(&format!("m{i}"))).unwrap();
        }
        let items = history.items();
        assert_eq!(items.len(), 50);
        assert_eq!(items[0].method, "m54");
        assert_eq!(items[49].method, "m5");
    }

    #[test]
    fn oversized_stored_log_is_truncated_on_load() {
        let store = Arc::new(MemoryStore::new());
        let long: Vec<CallHistoryItem> = (0..60).map(|i| item(&format!("m{i}"))).collect();
        save_json(store.as_ref(), KEY_CALL_HISTORY, &long).unwrap();

        let history = CallHistory::new(store, ChainFamily::Evm);
        assert_eq!(history.items().len(), 50);
    }

    #[test]
    fn families_use_separate_keys() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let evm = CallHistory::new(Arc::clone(&store), ChainFamily::Evm);
        let sui = CallHistory::new(Arc::clone(&store), ChainFamily::Sui);
        evm.push(item("eth_chainId")).unwrap();
        assert_eq!(evm.items().len(), 1);
        assert!(sui.items().is_empty());
        assert!(store.get("sui-rpc-caller-call-history").unwrap().is_none());
    }

    #[test]
    fn delete_and_clear() {
        let history = CallHistory::new(Arc::new(MemoryStore::new()), ChainFamily::Solana);
        history.push(item("getSlot")).unwrap();
        history.push(item("getHealth")).unwrap();
        let id = history.items()[1].id.clone();

        assert!(history.delete(&id).unwrap());
        assert!(!history.delete(&id).unwrap());
        assert_eq!(history.items()[0].method, "getHealth");

        history.clear().unwrap();
        assert!(history.items().is_empty());
    }

    #[test]
    fn ids_are_uuid_v4() {
        let entry = item("eth_blockNumber");
        let id = uuid::Uuid::parse_str(&entry.id).unwrap();
        assert_eq!(id.get_version_num(), 4);
        assert!(entry.timestamp > 0);
    }

    #[test]
    fn serialized_shape() {
        let failed = CallHistoryItem::new(NetworkId::from("devnet"), "https://rpc.test", "getSlot", vec![])
            .with_error("HTTP error! status: 500", 7);
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["chainId"], "devnet");
        assert_eq!(json["rpcUrl"], "https://rpc.test");
        assert_eq!(json["error"], "HTTP error! status: 500");
        assert_eq!(json["duration"], 7);
        assert!(json.get("response").is_none());
        assert!(failed.is_failure());
    }

    #[test]
    fn survives_reopening_a_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let first = CallHistory::new(Arc::new(FileStore::new(&path)), ChainFamily::Evm);
        first.push(item("eth_gasPrice")).unwrap();
        drop(first);

        let reopened = CallHistory::new(Arc::new(FileStore::new(&path)), ChainFamily::Evm);
        let items = reopened.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].method, "eth_gasPrice");
    }

    #[test]
    fn custom_limit() {
        let history =
            CallHistory::new(Arc::new(MemoryStore::new()), ChainFamily::Tron).with_limit(3);
        for i in 0..5 {
            history.push(item(&format!("m{i}"))).unwrap();
        }
        assert_eq!(history.items().len(), 3);
        assert_eq!(history.limit(), 3);
    }

    #[test]
    fn limit_cannot_exceed_fifty() {
        let history =
            CallHistory::new(Arc::new(MemoryStore::new()), ChainFamily::Evm).with_limit(100);
        assert_eq!(history.limit(), DEFAULT_HISTORY_LIMIT);
        for i in 0..60 {
            history.push(item(&format!("m{i}"))).unwrap();
        }
        assert_eq!(history.items().len(), 50);
        assert_eq!(history.items()[0].method, "m59");
    }
}

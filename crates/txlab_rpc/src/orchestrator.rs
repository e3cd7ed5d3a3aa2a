//! Endpoint selection for one chain selection.
//!
//! A probe round enumerates the public registry plus the custom overlay and
//! probes every endpoint concurrently. The first reachable endpoint is
//! selected as soon as it reports, so callers never wait on the slowest
//! probe. Once every probe has finished, the lowest-latency endpoint
//! replaces the early pick if it differs.
//!
//! Rounds started with [`EndpointOrchestrator::start_probe_round`] run on a
//! spawned task that is aborted by the next round, by
//! [`EndpointOrchestrator::shutdown`], or when the orchestrator is dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use txlab_chain::{ChainSelection, RpcEndpoint, all_endpoints, validate_endpoint_url};
use txlab_core::error::ToolboxError;
use txlab_core::session::SessionState;
use txlab_core::storage::KeyValueStore;

use crate::custom_endpoints::CustomEndpointStore;
use crate::latency_cache::LatencyCache;
use crate::prober::{Latency, LatencyProber, ProbeResult, select_best};

pub const DEFAULT_CUSTOM_NAME: &str = "Custom RPC";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeState {
    Idle,
    Probing,
    Settled,
}

#[derive(Debug)]
struct State {
    phase: ProbeState,
    endpoints: Vec<RpcEndpoint>,
    selected: Option<RpcEndpoint>,
    results: HashMap<String, ProbeResult>,
    all_unreachable: bool,
}

/// Point-in-time copy of the orchestrator state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorSnapshot {
    pub chain: String,
    pub state: ProbeState,
    pub endpoints: Vec<RpcEndpoint>,
    pub selected: Option<RpcEndpoint>,
    /// Known results, in endpoint order.
    pub results: Vec<ProbeResult>,
    pub all_unreachable: bool,
}

impl OrchestratorSnapshot {
    pub fn latency_of(&self, url: &str) -> Option<Latency> {
        self.results
            .iter()
            .find(|r| r.url == url)
            .map(|r| r.latency)
    }

    pub fn selected_url(&self) -> Option<&str> {
        self.selected.as_ref().map(|e| e.url.as_str())
    }
}

// ---------------------------------------------------------------------------
// Shared inner
// ---------------------------------------------------------------------------

struct Inner {
    selection: ChainSelection,
    prober: Arc<dyn LatencyProber>,
    custom: CustomEndpointStore,
    cache: LatencyCache,
    store: Arc<dyn KeyValueStore>,
    state: RwLock<State>,
    generation: AtomicU64,
}

impl Inner {
    fn merged_endpoints(&self) -> Vec<RpcEndpoint> {
        all_endpoints(&self.selection, &self.custom.list(&self.selection))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn persist_selection(&self, url: Option<&str>) {
        if let Err(e) = SessionState::save_selected_endpoint(self.store.as_ref(), url) {
            warn!(chain = %self.selection, "Failed to persist selected endpoint: {e:#}");
        }
    }

    async fn run_round(self: Arc<Self>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let endpoints = self.merged_endpoints();
        {
            let mut state = self.state.write();
            state.phase = ProbeState::Probing;
            state.endpoints = endpoints.clone();
            state.results.clear();
            state.all_unreachable = false;
        }
        info!(
            chain = %self.selection,
            endpoints = endpoints.len(),
            "Probing RPC endpoints"
        );

        let mut pending: FuturesUnordered<_> = endpoints
            .into_iter()
            .map(|endpoint| {
                let prober = Arc::clone(&self.prober);
                async move {
                    let latency = prober.probe(&endpoint).await;
                    let result = ProbeResult::new(endpoint.url.clone(), latency);
                    (endpoint, result)
                }
            })
            .collect();

        let mut early_selected = false;

        while let Some((endpoint, result)) = pending.next().await {
            if !self.is_current(generation) {
                return;
            }
            let latency = result.latency;
            let select_now = {
                let mut state = self.state.write();
                // The endpoint may have been removed while its probe was in flight.
                if !state.endpoints.iter().any(|e| e.url == endpoint.url) {
                    debug!(endpoint = %endpoint.url, "Discarding result for removed endpoint");
                    continue;
                }
                state.results.insert(endpoint.url.clone(), result);
                let select_now = !early_selected && latency.is_reachable();
                if select_now {
                    early_selected = true;
                    state.selected = Some(endpoint.clone());
                }
                select_now
            };
            if select_now {
                info!(
                    endpoint = %endpoint.url,
                    latency_ms = latency.as_millis().unwrap_or_default(),
                    "Early endpoint selection"
                );
                self.persist_selection(Some(&endpoint.url));
            }
        }

        if !self.is_current(generation) {
            return;
        }

        // Settle against the endpoint list as it is now, not as it was when
        // the round started.
        let (results, best, changed) = {
            let mut state = self.state.write();
            let results: Vec<ProbeResult> = state
                .endpoints
                .iter()
                .filter_map(|e| state.results.get(&e.url).cloned())
                .collect();
            let best = select_best(&results)
                .and_then(|best| state.endpoints.iter().find(|e| e.url == best.url))
                .cloned();

            state.phase = ProbeState::Settled;
            state.all_unreachable = best.is_none();
            let current = state.selected.as_ref().map(|e| e.url.as_str());
            let changed = current != best.as_ref().map(|e| e.url.as_str());
            if changed {
                state.selected = best.clone();
            }
            (results, best, changed)
        };

        match &best {
            Some(best) if changed => {
                info!(endpoint = %best.url, "Switched to lowest-latency endpoint");
            }
            Some(_) => {}
            None => warn!(chain = %self.selection, "All RPC endpoints are unreachable"),
        }
        if changed {
            self.persist_selection(best.as_ref().map(|e| e.url.as_str()));
        }

        if let Err(e) = self.cache.record(&results) {
            warn!("Failed to update latency cache: {e:#}");
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct EndpointOrchestrator {
    inner: Arc<Inner>,
    round: Mutex<Option<JoinHandle<()>>>,
}

impl EndpointOrchestrator {
    /// Build an orchestrator for `selection`.
    ///
    /// A previously persisted endpoint is restored when it belongs to this
    /// selection, and fresh cached latencies are shown until the first round
    /// replaces them.
    pub fn new(
        selection: ChainSelection,
        prober: Arc<dyn LatencyProber>,
        store: Arc<dyn KeyValueStore>,
        cache_ttl: Duration,
    ) -> Self {
        let custom = CustomEndpointStore::new(Arc::clone(&store));
        let cache = LatencyCache::new(Arc::clone(&store), cache_ttl);
        let endpoints = all_endpoints(&selection, &custom.list(&selection));

        let selected = SessionState::load(store.as_ref())
            .selected_endpoint
            .and_then(|url| endpoints.iter().find(|e| e.url == url).cloned());
        let results = endpoints
            .iter()
            .filter_map(|e| cache.fresh(&e.url).map(|result| (e.url.clone(), result)))
            .collect();

        Self {
            inner: Arc::new(Inner {
                selection,
                prober,
                custom,
                cache,
                store,
                state: RwLock::new(State {
                    phase: ProbeState::Idle,
                    endpoints,
                    selected,
                    results,
                    all_unreachable: false,
                }),
                generation: AtomicU64::new(0),
            }),
            round: Mutex::new(None),
        }
    }

    pub fn selection(&self) -> &ChainSelection {
        &self.inner.selection
    }

    pub fn snapshot(&self) -> OrchestratorSnapshot {
        let state = self.inner.state.read();
        let results = state
            .endpoints
            .iter()
            .filter_map(|e| state.results.get(&e.url).cloned())
            .collect();
        OrchestratorSnapshot {
            chain: self.inner.selection.to_string(),
            state: state.phase,
            endpoints: state.endpoints.clone(),
            selected: state.selected.clone(),
            results,
            all_unreachable: state.all_unreachable,
        }
    }

    pub fn selected_endpoint(&self) -> Option<RpcEndpoint> {
        self.inner.state.read().selected.clone()
    }

    /// Run a full round on the current task.
    pub async fn probe_all(&self) {
        self.abort_round();
        Arc::clone(&self.inner).run_round().await;
    }

    /// Start a round in the background, aborting any round still running.
    pub fn start_probe_round(&self) {
        let handle = tokio::spawn(Arc::clone(&self.inner).run_round());
        if let Some(previous) = self.round.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Wait for the background round, if any, to finish.
    pub async fn wait_for_round(&self) {
        let handle = self.round.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("Probe round task failed: {e}");
                }
            }
        }
    }

    /// Abort in-flight probes. The current selection is kept.
    pub fn shutdown(&self) {
        if self.abort_round() {
            debug!(chain = %self.inner.selection, "Aborted in-flight probe round");
        }
        let mut state = self.inner.state.write();
        if state.phase == ProbeState::Probing {
            state.phase = ProbeState::Idle;
        }
    }

    fn abort_round(&self) -> bool {
        match self.round.lock().take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Validate, persist and probe a user-supplied endpoint.
    ///
    /// Only the new endpoint is probed. It is selected when nothing else is.
    pub async fn add_custom_endpoint(
        &self,
        url: &str,
        name: Option<&str>,
    ) -> Result<ProbeResult, ToolboxError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ToolboxError::validation("Please enter RPC URL"));
        }
        if !validate_endpoint_url(url) {
            return Err(ToolboxError::validation(
                "Please enter a valid RPC URL (http:// or https://)",
            ));
        }
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_CUSTOM_NAME);

        let inner = &self.inner;
        let endpoint = RpcEndpoint::custom(url, name, inner.selection.network.clone());
        inner.custom.add(&inner.selection, endpoint.clone())?;
        inner.state.write().endpoints = inner.merged_endpoints();

        let result = ProbeResult::new(endpoint.url.clone(), inner.prober.probe(&endpoint).await);
        let selected = {
            let mut state = inner.state.write();
            state.results.insert(endpoint.url.clone(), result.clone());
            let select = state.selected.is_none() && result.latency.is_reachable();
            if select {
                state.selected = Some(endpoint.clone());
                state.all_unreachable = false;
            }
            select
        };
        if selected {
            info!(endpoint = %endpoint.url, "Selected newly added endpoint");
            inner.persist_selection(Some(&endpoint.url));
        }

        Ok(result)
    }

    /// Remove a custom endpoint. Removing the selected endpoint re-selects
    /// the fastest remaining one, or the first remaining one when no
    /// latencies are known.
    pub async fn remove_custom_endpoint(&self, url: &str) -> Result<bool, ToolboxError> {
        let inner = &self.inner;
        if !inner.custom.remove(&inner.selection, url)? {
            return Ok(false);
        }

        let reselected = {
            let mut state = inner.state.write();
            state.endpoints = inner.merged_endpoints();
            state.results.remove(url);

            if state.selected.as_ref().is_some_and(|e| e.url == url) {
                let known: Vec<ProbeResult> = state
                    .endpoints
                    .iter()
                    .filter_map(|e| state.results.get(&e.url).cloned())
                    .collect();
                let next = select_best(&known)
                    .and_then(|best| state.endpoints.iter().find(|e| e.url == best.url))
                    .or_else(|| state.endpoints.first())
                    .cloned();
                state.selected = next.clone();
                Some(next)
            } else {
                None
            }
        };

        if let Some(next) = reselected {
            let next_url = next.as_ref().map(|e| e.url.as_str());
            info!(removed = %url, selected = ?next_url, "Re-selected endpoint after removal");
            inner.persist_selection(next_url);
        }
        Ok(true)
    }

    /// Make `url` the working endpoint.
    pub fn select_endpoint(&self, url: &str) -> Result<RpcEndpoint, ToolboxError> {
        let endpoint = {
            let mut state = self.inner.state.write();
            let endpoint = state
                .endpoints
                .iter()
                .find(|e| e.url == url)
                .cloned()
                .ok_or_else(|| ToolboxError::validation(format!("Unknown RPC endpoint: {url}")))?;
            state.selected = Some(endpoint.clone());
            endpoint
        };
        self.inner.persist_selection(Some(&endpoint.url));
        Ok(endpoint)
    }
}

impl Drop for EndpointOrchestrator {
    fn drop(&mut self) {
        self.abort_round();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use txlab_chain::evm::SignatureInput;
use txlab_chain::rpc_methods::{categories, methods_by_category};
use txlab_chain::{
    ChainFamily, ChainSelection, RpcEndpoint, all_networks, catalog, decode_function_data,
    decode_parameters, decode_transaction, default_selection, find_method, generate_wallet,
    networks, private_key_to_address, recover_signer, search_methods,
};
use txlab_core::{KeyValueStore, SessionState, ToolboxError, TxlabConfig};
use txlab_rpc::orchestrator::DEFAULT_CUSTOM_NAME;
use txlab_rpc::{
    CallDispatcher, CallHistory, EndpointOrchestrator, HttpTransport, RpcLatencyProber,
    RpcTransport, generate_curl_command, parse_params,
};

use crate::cli::{AbiCommand, Command, EndpointsCommand};

/// Shared handles for one invocation.
pub struct AppContext {
    pub config: TxlabConfig,
    pub store: Arc<dyn KeyValueStore>,
    pub transport: Arc<dyn RpcTransport>,
}

impl AppContext {
    pub fn new(config: TxlabConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            config,
            store,
            transport: Arc::new(HttpTransport::new()),
        }
    }

    /// Explicit chain, else the persisted one, else the configured default
    /// family's first network. The result is remembered for next time.
    fn resolve_chain(&self, explicit: Option<ChainSelection>) -> Result<ChainSelection> {
        let selection = match explicit {
            Some(selection) => selection,
            None => match SessionState::load(self.store.as_ref())
                .selected_chain
                .and_then(|s| s.parse().ok())
            {
                Some(persisted) => persisted,
                None => self.default_chain()?,
            },
        };
        SessionState::save_selected_chain(self.store.as_ref(), Some(&selection.to_string()))?;
        Ok(selection)
    }

    fn default_chain(&self) -> Result<ChainSelection> {
        let family: ChainFamily = self.config.default_family.parse().map_err(user_error)?;
        Ok(default_selection(family))
    }

    fn resolve_family(&self, explicit: Option<ChainFamily>) -> Result<ChainFamily> {
        match explicit {
            Some(family) => Ok(family),
            None => Ok(self.resolve_chain(None)?.family),
        }
    }

    fn orchestrator(&self, selection: ChainSelection) -> EndpointOrchestrator {
        let prober = RpcLatencyProber::new(
            Arc::clone(&self.transport),
            selection.family,
            self.config.probe_timeout(),
        );
        EndpointOrchestrator::new(
            selection,
            Arc::new(prober),
            Arc::clone(&self.store),
            self.config.latency_cache_ttl(),
        )
    }

    fn history(&self, family: ChainFamily) -> CallHistory {
        CallHistory::new(Arc::clone(&self.store), family).with_limit(self.config.history_limit)
    }
}

/// Surface a toolbox error with its user-facing message.
fn user_error(err: ToolboxError) -> anyhow::Error {
    debug!(category = ?err.category(), "Command failed: {err}");
    anyhow!(err.user_message())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `@path` reads the argument from a file.
fn read_arg(value: &str) -> Result<String> {
    match value.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}")),
        None => Ok(value.to_string()),
    }
}

pub async fn run(ctx: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::DecodeEvm { hex } => decode(ChainFamily::Evm, &read_arg(&hex)?),
        Command::DecodeSolana { encoded } => decode(ChainFamily::Solana, &read_arg(&encoded)?),
        Command::Abi { command } => abi(command),
        Command::Recover {
            hash,
            signature,
            r,
            s,
            v,
        } => {
            let input = match signature {
                Some(sig) => SignatureInput::Combined(sig),
                None => SignatureInput::Components {
                    r: r.unwrap_or_default(),
                    s: s.unwrap_or_default(),
                    v,
                },
            };
            print_json(&recover_signer(&hash, &input).map_err(user_error)?)
        }
        Command::KeyToAddress { key } => {
            let address = private_key_to_address(&key).map_err(user_error)?;
            print_json(&json!({ "address": address }))
        }
        Command::Wallet { chars, salt } => {
            print_json(&generate_wallet(&chars, salt.as_deref()).map_err(user_error)?)
        }
        Command::Networks { family } => match family {
            Some(family) => print_json(&networks(family).collect::<Vec<_>>()),
            None => print_json(all_networks()),
        },
        Command::Methods {
            family,
            category,
            search,
            categories: only_categories,
        } => methods(family, category, search, only_categories),
        Command::Probe { chain } => probe(ctx, chain).await,
        Command::Call {
            chain,
            endpoint,
            method,
            params,
        } => call(ctx, chain, endpoint, &method, params).await,
        Command::Curl {
            endpoint,
            method,
            params,
        } => {
            let params = parse_params(params.as_deref().unwrap_or_default()).map_err(user_error)?;
            println!("{}", generate_curl_command(&endpoint, &method, &params));
            Ok(())
        }
        Command::History {
            family,
            delete,
            clear,
        } => history(ctx, family, delete, clear),
        Command::Endpoints { command } => endpoints(ctx, command).await,
    }
}

fn decode(family: ChainFamily, input: &str) -> Result<()> {
    match decode_transaction(family, input).map_err(user_error)? {
        Some(decoded) => print_json(&decoded),
        None => Err(user_error(ToolboxError::validation(
            "Please enter a transaction to decode",
        ))),
    }
}

fn abi(command: AbiCommand) -> Result<()> {
    match command {
        AbiCommand::Function { abi, data } => {
            let abi = read_arg(&abi)?;
            print_json(&decode_function_data(&abi, &data).map_err(user_error)?)
        }
        AbiCommand::Params { types, data } => {
            print_json(&decode_parameters(&types, &data).map_err(user_error)?)
        }
    }
}

fn methods(
    family: ChainFamily,
    category: Option<String>,
    search: Option<String>,
    only_categories: bool,
) -> Result<()> {
    if only_categories {
        return print_json(&categories(family));
    }
    let methods = match (&search, &category) {
        (Some(query), category) => {
            let mut found = search_methods(family, query);
            if let Some(category) = category {
                found.retain(|m| &m.category == category);
            }
            found
        }
        (None, Some(category)) => methods_by_category(family, category),
        (None, None) => catalog(family).iter().collect(),
    };
    print_json(&methods)
}

async fn probe(ctx: &AppContext, chain: Option<ChainSelection>) -> Result<()> {
    let selection = ctx.resolve_chain(chain)?;
    let orchestrator = ctx.orchestrator(selection);
    orchestrator.probe_all().await;
    let snapshot = orchestrator.snapshot();
    if snapshot.all_unreachable {
        info!(chain = %snapshot.chain, "No endpoint answered");
    }
    print_json(&snapshot)
}

async fn call(
    ctx: &AppContext,
    chain: Option<ChainSelection>,
    endpoint: Option<String>,
    method: &str,
    params: Option<String>,
) -> Result<()> {
    let selection = ctx.resolve_chain(chain)?;
    let family = selection.family;
    let orchestrator = ctx.orchestrator(selection.clone());

    let endpoint = match endpoint {
        Some(url) => orchestrator
            .snapshot()
            .endpoints
            .into_iter()
            .find(|e| e.url == url)
            .unwrap_or_else(|| RpcEndpoint::custom(url, DEFAULT_CUSTOM_NAME, selection.network.clone())),
        None => {
            if orchestrator.selected_endpoint().is_none() {
                orchestrator.probe_all().await;
            }
            orchestrator
                .selected_endpoint()
                .ok_or_else(|| anyhow!("All RPC endpoints for {selection} are unreachable"))?
        }
    };

    let params_text = match params {
        Some(text) => text,
        None => find_method(family, method.trim())
            .map(|m| m.default_params_text())
            .unwrap_or_default(),
    };

    let dispatcher = CallDispatcher::new(Arc::clone(&ctx.transport), ctx.history(family))
        .with_timeout(ctx.config.call_timeout());
    let outcome = dispatcher
        .call_text(&endpoint, method, &params_text)
        .await
        .map_err(user_error)?;

    print_json(&json!({
        "endpoint": endpoint.url,
        "durationMs": outcome.duration_ms,
        "response": outcome.response,
    }))?;
    if let Some(err) = outcome.rpc_error() {
        return Err(anyhow!("RPC error {}: {}", err.code, err.message));
    }
    Ok(())
}

fn history(
    ctx: &AppContext,
    family: Option<ChainFamily>,
    delete: Option<String>,
    clear: bool,
) -> Result<()> {
    let history = ctx.history(ctx.resolve_family(family)?);
    if clear {
        history.clear()?;
        println!("History cleared");
        return Ok(());
    }
    if let Some(id) = delete {
        if !history.delete(&id)? {
            return Err(anyhow!("No history entry with id {id}"));
        }
        println!("Deleted {id}");
        return Ok(());
    }
    print_json(&history.items())
}

async fn endpoints(ctx: &AppContext, command: EndpointsCommand) -> Result<()> {
    match command {
        EndpointsCommand::List { chain } => {
            let orchestrator = ctx.orchestrator(ctx.resolve_chain(chain)?);
            print_json(&orchestrator.snapshot().endpoints)
        }
        EndpointsCommand::Add { chain, url, name } => {
            let orchestrator = ctx.orchestrator(ctx.resolve_chain(chain)?);
            let result = orchestrator
                .add_custom_endpoint(&url, name.as_deref())
                .await
                .map_err(user_error)?;
            print_json(&result)
        }
        EndpointsCommand::Remove { chain, url } => {
            let orchestrator = ctx.orchestrator(ctx.resolve_chain(chain)?);
            if !orchestrator
                .remove_custom_endpoint(&url)
                .await
                .map_err(user_error)?
            {
                return Err(anyhow!("No custom endpoint {url}"));
            }
            println!("Removed {url}");
            Ok(())
        }
    }
}

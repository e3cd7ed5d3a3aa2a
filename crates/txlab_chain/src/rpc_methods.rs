//! Catalogs of well-known JSON-RPC methods per chain family.
//!
//! The catalogs are reference data used to pre-fill call forms: each method
//! carries a parameter schema (recursive for object-typed parameters) with
//! optional defaults and examples. The data ships as JSON next to the crate
//! and is parsed once on first use.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::chain::ChainFamily;

/// One parameter of an RPC method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamField {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    /// Nested fields for object-typed parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ParamField>,
}

impl ParamField {
    /// Value used to pre-fill this parameter: the default, else the example,
    /// else `null`.
    pub fn prefill(&self) -> Value {
        self.default
            .clone()
            .or_else(|| self.example.clone())
            .unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSpec {
    #[serde(rename = "type")]
    pub return_type: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodExample {
    pub request: Value,
    pub response: Value,
}

/// Static descriptor of a JSON-RPC method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcMethod {
    pub name: String,
    pub description: String,
    pub category: String,
    pub params: Vec<ParamField>,
    pub returns: ReturnSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<MethodExample>,
}

impl RpcMethod {
    /// Positional parameter array pre-filled from the schema.
    pub fn default_params(&self) -> Vec<Value> {
        self.params.iter().map(ParamField::prefill).collect()
    }

    /// [`default_params`](Self::default_params) as pretty-printed JSON text,
    /// ready for an editable params field.
    pub fn default_params_text(&self) -> String {
        serde_json::to_string_pretty(&self.default_params()).unwrap_or_else(|_| "[]".into())
    }
}

// ---------------------------------------------------------------------------
// Catalog data
// ---------------------------------------------------------------------------

fn parse_catalog(family: ChainFamily, raw: &str) -> Vec<RpcMethod> {
    match serde_json::from_str(raw) {
        Ok(methods) => methods,
        Err(e) => {
            error!(family = %family, "Failed to parse RPC method catalog: {e}");
            Vec::new()
        }
    }
}

static EVM_METHODS: Lazy<Vec<RpcMethod>> = Lazy::new(|| {
    parse_catalog(ChainFamily::Evm, include_str!("../catalog/evm_methods.json"))
});

static SOLANA_METHODS: Lazy<Vec<RpcMethod>> = Lazy::new(|| {
    parse_catalog(ChainFamily::Solana, include_str!("../catalog/solana_methods.json"))
});

static TRON_METHODS: Lazy<Vec<RpcMethod>> = Lazy::new(|| {
    parse_catalog(ChainFamily::Tron, include_str!("../catalog/tron_methods.json"))
});

static SUI_METHODS: Lazy<Vec<RpcMethod>> = Lazy::new(|| {
    parse_catalog(ChainFamily::Sui, include_str!("../catalog/sui_methods.json"))
});

/// All known methods for a family, in catalog order.
pub fn catalog(family: ChainFamily) -> &'static [RpcMethod] {
    match family {
        ChainFamily::Evm => &EVM_METHODS,
        ChainFamily::Solana => &SOLANA_METHODS,
        ChainFamily::Tron => &TRON_METHODS,
        ChainFamily::Sui => &SUI_METHODS,
    }
}

pub fn find_method(family: ChainFamily, name: &str) -> Option<&'static RpcMethod> {
    catalog(family).iter().find(|m| m.name == name)
}

pub fn methods_by_category(family: ChainFamily, category: &str) -> Vec<&'static RpcMethod> {
    catalog(family)
        .iter()
        .filter(|m| m.category == category)
        .collect()
}

/// Distinct categories in first-appearance order.
pub fn categories(family: ChainFamily) -> Vec<&'static str> {
    let mut seen: Vec<&'static str> = Vec::new();
    for method in catalog(family) {
        if !seen.contains(&method.category.as_str()) {
            seen.push(method.category.as_str());
        }
    }
    seen
}

/// Case-insensitive substring search over method names and descriptions.
pub fn search_methods(family: ChainFamily, query: &str) -> Vec<&'static RpcMethod> {
    let needle = query.trim().to_lowercase();
    catalog(family)
        .iter()
        .filter(|m| {
            m.name.to_lowercase().contains(&needle)
                || m.description.to_lowercase().contains(&needle)
        })
        .collect()
}

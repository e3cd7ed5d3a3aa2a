//! ABI decoding of contract call data.
//!
//! Two modes: full function call data matched against an ABI by selector,
//! and a bare parameter tuple decoded against a comma-separated type list.
//! Decoded values are rendered as JSON with integers as decimal strings.

use alloy_dyn_abi::{DynSolValue, JsonAbiExt};
use alloy_json_abi::{Function, JsonAbi, Param};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use txlab_core::codec::{bytes_to_hex, hex_to_bytes, normalize_hex};
use txlab_core::error::ToolboxError;

const ITEM_KEYWORDS: [&str; 6] = ["function", "event", "error", "constructor", "fallback", "receive"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedArg {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedCall {
    pub function_name: String,
    pub signature: String,
    pub selector: String,
    pub args: Vec<DecodedArg>,
}

/// Decode full call data (selector + arguments) against an ABI.
///
/// `abi` is a JSON ABI array, a single JSON ABI item, or human-readable
/// signatures (one per line).
pub fn decode_function_data(abi: &str, data: &str) -> Result<DecodedCall, ToolboxError> {
    let bytes = encoded_data(data)?;
    if abi.trim().is_empty() {
        return Err(ToolboxError::validation(
            "Please provide ABI for function decoding",
        ));
    }

    let abi = parse_abi(abi)?;
    if bytes.len() < 4 {
        return Err(ToolboxError::decode(
            "Failed to decode: data is shorter than a function selector",
        ));
    }
    let (selector, args) = bytes.split_at(4);

    let function = abi
        .functions()
        .find(|f| f.selector().as_slice() == selector)
        .ok_or_else(|| {
            ToolboxError::decode(format!(
                "Failed to decode: no function in the ABI matches selector {}",
                bytes_to_hex(selector)
            ))
        })?;

    let values = function.abi_decode_input(args).map_err(|e| {
        warn!(function = %function.name, "Call data does not match ABI: {e}");
        ToolboxError::decode("Failed to decode: data does not match the function inputs")
    })?;

    debug!(function = %function.name, args = values.len(), "Decoded function data");

    Ok(DecodedCall {
        function_name: function.name.clone(),
        signature: function.signature(),
        selector: bytes_to_hex(selector),
        args: named_args(&function.inputs, values),
    })
}

/// Decode a bare parameter tuple (no selector) against a comma-separated
/// type list such as `"uint256, address to, string"`.
pub fn decode_parameters(types: &str, data: &str) -> Result<Vec<DecodedArg>, ToolboxError> {
    let bytes = encoded_data(data)?;
    let types = types.trim();
    if types.is_empty() {
        return Err(ToolboxError::validation(
            "Please provide parameter types (e.g., \"uint256, address, string\")",
        ));
    }

    let carrier = Function::parse(&format!("function decode({types})")).map_err(|e| {
        debug!("Invalid parameter type list: {e}");
        ToolboxError::decode(format!("Failed to decode: invalid parameter types \"{types}\""))
    })?;

    let values = carrier.abi_decode_input(&bytes).map_err(|e| {
        warn!("Parameter data does not match types: {e}");
        ToolboxError::decode("Failed to decode: data does not match the parameter types")
    })?;

    Ok(named_args(&carrier.inputs, values))
}

/// Render a decoded ABI value as JSON. Integers become decimal strings and
/// addresses are checksummed.
pub fn value_to_json(value: &DynSolValue) -> Value {
    #[allow(unreachable_patterns)]
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => Value::String(bytes_to_hex(&word[..*size])),
        DynSolValue::Address(addr) => Value::String(addr.to_checksum(None)),
        DynSolValue::Function(f) => Value::String(bytes_to_hex(f)),
        DynSolValue::Bytes(b) => Value::String(bytes_to_hex(b)),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(value_to_json).collect())
        }
        _ => Value::Null,
    }
}

fn named_args(params: &[Param], values: Vec<DynSolValue>) -> Vec<DecodedArg> {
    params
        .iter()
        .zip(values)
        .map(|(param, value)| DecodedArg {
            name: param.name.clone(),
            param_type: param.selector_type().into_owned(),
            value: value_to_json(&value),
        })
        .collect()
}

fn encoded_data(data: &str) -> Result<Vec<u8>, ToolboxError> {
    let data = data.trim();
    if data.is_empty() {
        return Err(ToolboxError::validation("Please provide encoded data"));
    }
    hex_to_bytes(&normalize_hex(data), "Encoded data")
}

fn parse_abi(input: &str) -> Result<JsonAbi, ToolboxError> {
    let input = input.trim();
    if let Ok(json) = serde_json::from_str::<Value>(input) {
        let items = match json {
            Value::Array(_) => json,
            other => Value::Array(vec![other]),
        };
        return serde_json::from_value(items).map_err(|e| {
            debug!("Invalid JSON ABI: {e}");
            ToolboxError::decode("Failed to decode: invalid JSON ABI")
        });
    }

    let lines: Vec<String> = input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let line = line.trim_end_matches([';', ',']);
            if ITEM_KEYWORDS.iter().any(|kw| line.starts_with(kw)) {
                line.to_string()
            } else {
                format!("function {line}")
            }
        })
        .collect();

    JsonAbi::parse(lines.iter().map(String::as_str)).map_err(|e| {
        debug!("Invalid human-readable ABI: {e}");
        ToolboxError::decode("Failed to decode: invalid ABI")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPIENT: &str = "000000000000000000000000d8da6bf26964af9d7eed9e10c46a69b2e4c0a6f6";
    // 1e24, larger than any f64-safe integer.
    const AMOUNT: &str = "00000000000000000000000000000000000000000000d3c21bcecceda1000000";

    fn transfer_data() -> String {
        format!("0xa9059cbb{RECIPIENT}{AMOUNT}")
    }

    #[test]
    fn human_readable_signature() {
        let call = decode_function_data(
            "function transfer(address to, uint256 amount)",
            &transfer_data(),
        )
        .unwrap();
        assert_eq!(call.function_name, "transfer");
        assert_eq!(call.signature, "transfer(address,uint256)");
        assert_eq!(call.selector, "0xa9059cbb");
        assert_eq!(call.args.len(), 2);
        assert_eq!(call.args[0].name, "to");
        assert_eq!(call.args[0].param_type, "address");
        assert_eq!(
            call.args[0].value,
            Value::String("0xD8DA6bf26964AF9D7eED9e10C46a69b2E4c0a6F6".into())
        );
        assert_eq!(
            call.args[1].value,
            Value::String("1000000000000000000000000".into())
        );
    }

    #[test]
    fn keyword_is_optional_for_human_readable() {
        let call = decode_function_data("transfer(address,uint256)", &transfer_data()).unwrap();
        assert_eq!(call.function_name, "transfer");
        assert!(call.args[0].name.is_empty());
    }

    #[test]
    fn json_abi_object_is_wrapped() {
        let abi = r#"{
            "type": "function",
            "name": "transfer",
            "stateMutability": "nonpayable",
            "inputs": [
                {"name": "to", "type": "address"},
                {"name": "amount", "type": "uint256"}
            ],
            "outputs": [{"name": "", "type": "bool"}]
        }"#;
        let call = decode_function_data(abi, &transfer_data()).unwrap();
        assert_eq!(call.function_name, "transfer");
        assert_eq!(call.args[1].name, "amount");
    }

    #[test]
    fn json_abi_array_picks_function_by_selector() {
        let abi = r#"[
            {"type": "function", "name": "approve", "stateMutability": "nonpayable",
             "inputs": [{"name": "spender", "type": "address"}, {"name": "value", "type": "uint256"}],
             "outputs": []},
            {"type": "function", "name": "transfer", "stateMutability": "nonpayable",
             "inputs": [{"name": "to", "type": "address"}, {"name": "value", "type": "uint256"}],
             "outputs": []}
        ]"#;
        let call = decode_function_data(abi, &transfer_data()).unwrap();
        assert_eq!(call.function_name, "transfer");
    }

    #[test]
    fn missing_prefix_is_accepted() {
        let data = transfer_data().trim_start_matches("0x").to_string();
        assert!(decode_function_data("function transfer(address,uint256)", &data).is_ok());
    }

    #[test]
    fn unknown_selector_is_decode_error() {
        let err = decode_function_data("function approve(address,uint256)", &transfer_data())
            .unwrap_err();
        assert!(matches!(err, ToolboxError::Decode(ref m) if m.contains("0xa9059cbb")));
    }

    #[test]
    fn truncated_arguments_are_decode_error() {
        let data = format!("0xa9059cbb{RECIPIENT}");
        let err = decode_function_data("function transfer(address,uint256)", &data).unwrap_err();
        assert!(matches!(err, ToolboxError::Decode(_)));
    }

    #[test]
    fn input_validation_messages() {
        assert_eq!(
            decode_function_data("function f()", "  ").unwrap_err(),
            ToolboxError::validation("Please provide encoded data")
        );
        assert_eq!(
            decode_function_data("", "0x12345678").unwrap_err(),
            ToolboxError::validation("Please provide ABI for function decoding")
        );
        assert_eq!(
            decode_parameters(" ", "0x00").unwrap_err(),
            ToolboxError::validation(
                "Please provide parameter types (e.g., \"uint256, address, string\")"
            )
        );
        assert!(matches!(
            decode_parameters("uint256", "0xnothex").unwrap_err(),
            ToolboxError::Validation(_)
        ));
    }

    #[test]
    fn parameters_uint_and_address() {
        let data = format!("{AMOUNT}{RECIPIENT}");
        let args = decode_parameters("uint256, address", &data).unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].value, Value::String("1000000000000000000000000".into()));
        assert_eq!(
            args[1].value,
            Value::String("0xD8DA6bf26964AF9D7eED9e10C46a69b2E4c0a6F6".into())
        );
    }

    #[test]
    fn parameters_keep_names_and_dynamic_types() {
        // (uint8 flag, string label) with label = "hi"
        let data = concat!(
            "0000000000000000000000000000000000000000000000000000000000000001",
            "0000000000000000000000000000000000000000000000000000000000000040",
            "0000000000000000000000000000000000000000000000000000000000000002",
            "6869000000000000000000000000000000000000000000000000000000000000",
        );
        let args = decode_parameters("uint8 flag, string label", data).unwrap();
        assert_eq!(args[0].name, "flag");
        assert_eq!(args[0].value, Value::String("1".into()));
        assert_eq!(args[1].name, "label");
        assert_eq!(args[1].value, Value::String("hi".into()));
    }

    #[test]
    fn invalid_type_list_is_decode_error() {
        let err = decode_parameters("uint257", AMOUNT).unwrap_err();
        assert!(matches!(err, ToolboxError::Decode(_)));
    }

    #[test]
    fn value_conversion_covers_composites() {
        use alloy_primitives::{B256, I256, U256};

        let value = DynSolValue::Tuple(vec![
            DynSolValue::Bool(true),
            DynSolValue::Int(I256::try_from(-5i64).unwrap(), 256),
            DynSolValue::FixedBytes(B256::repeat_byte(0xab), 2),
            DynSolValue::Array(vec![DynSolValue::Uint(U256::from(7u8), 8)]),
            DynSolValue::Bytes(vec![0x01, 0x02]),
        ]);
        assert_eq!(
            value_to_json(&value),
            serde_json::json!([true, "-5", "0xabab", ["7"], "0x0102"])
        );
    }
}

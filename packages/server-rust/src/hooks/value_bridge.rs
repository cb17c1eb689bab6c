//! Conversions between the engine's `Value` and `rhai::Dynamic`, so entry
//! processor and resolver scripts see plain Rhai values (maps, arrays,
//! strings, numbers) rather than the wire-level `rmpv` representation.

use std::collections::BTreeMap;

use rhai::Dynamic;
use topgun_core::Value;

/// Converts a stored `Value` into the `Dynamic` a script sees.
pub fn value_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Int(n) => Dynamic::from(*n),
        Value::Float(f) => Dynamic::from(*f),
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Bytes(b) => Dynamic::from_blob(b.clone()),
        Value::Array(items) => {
            let arr: Vec<Dynamic> = items.iter().map(value_to_dynamic).collect();
            Dynamic::from_array(arr)
        }
        Value::Map(map) => {
            let mut rhai_map = rhai::Map::new();
            for (k, v) in map {
                rhai_map.insert(k.clone().into(), value_to_dynamic(v));
            }
            Dynamic::from_map(rhai_map)
        }
    }
}

/// Converts a script's `Dynamic` result back into a storable `Value`.
///
/// Types a script cannot plausibly produce in a well-formed processor
/// (function pointers, shared cells that fail to read) convert to
/// `Value::Null` rather than erroring -- callers that need to distinguish
/// "wrote null" from "wrote nothing sensible" should check `Dynamic::is_unit`
/// on the original value first.
pub fn dynamic_to_value(dynamic: &Dynamic) -> Value {
    if dynamic.is_unit() {
        return Value::Null;
    }
    if let Some(b) = dynamic.clone().try_cast::<bool>() {
        return Value::Bool(b);
    }
    if let Some(n) = dynamic.clone().try_cast::<i64>() {
        return Value::Int(n);
    }
    if let Some(f) = dynamic.clone().try_cast::<f64>() {
        return Value::Float(f);
    }
    if let Some(s) = dynamic.clone().try_cast::<rhai::ImmutableString>() {
        return Value::String(s.to_string());
    }
    if let Some(blob) = dynamic.clone().try_cast::<rhai::Blob>() {
        return Value::Bytes(blob);
    }
    if let Some(arr) = dynamic.clone().try_cast::<rhai::Array>() {
        return Value::Array(arr.iter().map(dynamic_to_value).collect());
    }
    if let Some(map) = dynamic.clone().try_cast::<rhai::Map>() {
        let mut out = BTreeMap::new();
        for (k, v) in &map {
            out.insert(k.to_string(), dynamic_to_value(v));
        }
        return Value::Map(out);
    }
    Value::Null
}

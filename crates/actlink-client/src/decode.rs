//! Wire payload to [`CombatEvent`] decoding.
//!
//! The stream transport hands over text or binary frames; the callback
//! transport hands over already-parsed JSON values. Both end up in
//! [`decode_value`], so the object check and the error variants are shared.

use actlink_core::{CombatEvent, DecodeError};
use serde_json::Value;

/// Decode a text frame.
pub fn decode_text(text: &str) -> Result<CombatEvent, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    decode_value(value)
}

/// Decode a binary frame holding UTF-8 JSON.
pub fn decode_bytes(bytes: &[u8]) -> Result<CombatEvent, DecodeError> {
    decode_text(std::str::from_utf8(bytes)?)
}

/// Decode a JSON value pushed over IPC.
pub fn decode_value(value: Value) -> Result<CombatEvent, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::NotAnObject {
            kind: json_kind(&value),
        });
    }
    Ok(serde_json::from_value(value)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

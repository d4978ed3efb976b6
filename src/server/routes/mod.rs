//! Request parsing helpers for the thinking routes
//!
//! Route handlers live in `thinking_routes`; the helpers here pull typed
//! fields out of a loosely-typed JSON body and turn bad input into
//! `INVALID_INPUT` before any engine is started.

pub mod thinking_routes;

use serde_json::{Map, Value};

use crate::models::{Turn, DEBATE_TURNS};

use super::error::ApiError;

/// Parse the raw request body. A body that is not JSON is a server error.
pub fn parse_body(bytes: &[u8]) -> Result<Value, ApiError> {
    serde_json::from_slice(bytes).map_err(|e| ApiError::Server(format!("Invalid JSON body: {}", e)))
}

/// Required, trimmed, non-empty topic. Numbers are accepted as text.
pub fn get_topic(body: &Value) -> Result<String, ApiError> {
    let topic = match body.get("topic") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if topic.is_empty() {
        return Err(ApiError::invalid_input("topic is required"));
    }
    Ok(topic)
}

/// Read an optional integer field; numeric strings are accepted
fn get_opt_integer(body: &Value, name: &str) -> Result<Option<i64>, ApiError> {
    let invalid = || ApiError::invalid_input(format!("{} must be an integer", name));
    match body.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
                    _ => Err(invalid()),
                }
            }
        }
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// Round number, at least 1, defaults to 1
pub fn get_round(body: &Value) -> Result<u32, ApiError> {
    match get_opt_integer(body, "round")? {
        None => Ok(1),
        Some(round) if round >= 1 && round <= u32::MAX as i64 => Ok(round as u32),
        Some(_) => Err(ApiError::invalid_input("round must be >= 1")),
    }
}

/// Seed for deterministic mock content, defaults to 42
pub fn get_seed(body: &Value) -> Result<i64, ApiError> {
    Ok(get_opt_integer(body, "seed")?.unwrap_or(42))
}

/// Optional free-text note; non-string values are ignored
pub fn get_user_note(body: &Value) -> Option<String> {
    body.get("userNote")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Exactly four `{role: "pro"|"con", text}` turns
pub fn get_debate(body: &Value) -> Result<Vec<Turn>, ApiError> {
    let turns = match body.get("debate") {
        Some(Value::Array(turns)) if turns.len() == DEBATE_TURNS => turns,
        _ => return Err(ApiError::invalid_input("debate (4 turns) is required")),
    };

    turns
        .iter()
        .enumerate()
        .map(|(i, turn)| {
            serde_json::from_value::<Turn>(turn.clone()).map_err(|_| {
                ApiError::invalid_input(format!(
                    "debate[{}] must have role 'pro' or 'con' and text",
                    i
                ))
            })
        })
        .collect()
}

/// Optional structure object; anything that is not an object is ignored
pub fn get_structure(body: &Value) -> Option<Value> {
    body.get("structure").filter(|v| v.is_object()).cloned()
}

/// Keep only `topic`, `round`, the mode's result field and `meta` from an
/// engine payload. Absent fields are left out rather than nulled.
pub fn shape_success(payload: &Value, result_field: &str) -> Value {
    let mut body = Map::new();
    body.insert("ok".to_string(), Value::Bool(true));
    for key in ["topic", "round", result_field, "meta"] {
        if let Some(value) = payload.get(key) {
            body.insert(key.to_string(), value.clone());
        }
    }
    Value::Object(body)
}

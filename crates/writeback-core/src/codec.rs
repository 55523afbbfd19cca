//! Snapshot encoding and decoding.
//!
//! Snapshots are persisted as JSON. Fields listed in `ignore_keys` are
//! dropped at the top level while serializing, so an ignored field never
//! reaches storage and the caller's state is never touched. Nested objects
//! are written as-is even if they contain a field with an ignored name.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Why a persisted record could not be turned back into a state mapping.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The record is not valid JSON.
    #[error("malformed snapshot: {source}")]
    Malformed {
        /// The underlying parse error.
        #[from]
        source: serde_json::Error,
    },

    /// The record is valid JSON but not an object.
    #[error("snapshot is a JSON {found}, expected an object")]
    NotAMapping {
        /// The kind of JSON value found.
        found: &'static str,
    },
}

/// Serialize `state`, leaving out every top-level field named in
/// `ignore_keys`.
///
/// Non-object states have no top-level fields and are serialized unchanged.
///
/// # Errors
///
/// Returns the serializer error if `state` cannot be written as JSON.
pub fn encode(state: &Value, ignore_keys: &[String]) -> Result<String, serde_json::Error> {
    match state {
        Value::Object(fields) if !ignore_keys.is_empty() => {
            serde_json::to_string(&WithoutIgnored {
                fields,
                ignore_keys,
            })
        }
        _ => serde_json::to_string(state),
    }
}

/// Parse a persisted record back into a state mapping.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] for invalid JSON and
/// [`DecodeError::NotAMapping`] for JSON that is not an object.
pub fn decode(raw: &str) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(fields) => Ok(fields),
        other => Err(DecodeError::NotAMapping {
            found: kind_of(&other),
        }),
    }
}

/// Borrowed view of an object that skips ignored fields while serializing.
struct WithoutIgnored<'a> {
    fields: &'a Map<String, Value>,
    ignore_keys: &'a [String],
}

impl Serialize for WithoutIgnored<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.fields
                .iter()
                .filter(|(name, _)| !self.ignore_keys.contains(*name)),
        )
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

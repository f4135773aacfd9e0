//! JSON record extraction
//!
//! Response bodies are JSON objects with an array of records at a fixed
//! location (`$.data[*]`) and an optional next-page pointer at another fixed
//! location. The decoder turns a body into raw records; a path that matches
//! nothing yields an empty record set, not an error.

use crate::error::{Error, Result};
use serde_json::Value;

/// JSON decoder with a record path
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder {
    /// JSONPath to the record array
    records_path: Option<String>,
}

impl JsonDecoder {
    /// Create a decoder that treats the whole body as records
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with a record path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            records_path: Some(path.into()),
        }
    }

    /// Parse a body and return one `Value` per record
    pub fn decode(&self, body: &str) -> Result<Vec<Value>> {
        let value: Value = serde_json::from_str(body).map_err(|e| Error::Decode {
            message: format!("Failed to parse JSON: {e}"),
        })?;
        Ok(self.extract_records(&value))
    }

    /// Extract records from an already-parsed value
    pub fn extract_records(&self, value: &Value) -> Vec<Value> {
        match &self.records_path {
            Some(path) => {
                // Wildcard patterns go through jsonpath-rust; plain dot
                // paths use the cheaper simple traversal.
                if path.contains('*') {
                    extract_with_jsonpath(value, path)
                } else {
                    match extract_path(value, path) {
                        Some(Value::Array(arr)) => arr,
                        Some(v) => vec![v],
                        None => vec![],
                    }
                }
            }
            None => match value {
                Value::Array(arr) => arr.clone(),
                _ => vec![value.clone()],
            },
        }
    }
}

/// Extract a value using a simple dot-notation path (e.g.
/// `$.pagination_data.next_url`). Returns None when any segment is missing.
pub fn extract_path(value: &Value, path: &str) -> Option<Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        // Strip a trailing `[*]` so `data[*]` resolves to the array itself
        let part = part.strip_suffix("[*]").unwrap_or(part);
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            _ => return None,
        }
    }

    Some(current.clone())
}

/// Extract records using jsonpath-rust for wildcard paths like `$.data[*]`
fn extract_with_jsonpath(value: &Value, path: &str) -> Vec<Value> {
    use jsonpath_rust::JsonPath;

    let Ok(jp) = JsonPath::try_from(path) else {
        return vec![];
    };

    match jp.find(value) {
        Value::Array(arr) => arr,
        Value::Null => vec![],
        other => vec![other],
    }
}

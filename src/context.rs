//! Parent→child context
//!
//! A `Context` carries the identifiers a parent record hands to a dependent
//! child stream (e.g. `survey_id` for responses, `respondent_uuid` for
//! respondent attributes). One context is created per parent record, consumed
//! by the child requests derived from that record, then discarded. Contexts
//! are plain values — they are never shared mutable state.

use serde_json::Value;
use std::collections::HashMap;

/// Key-value data propagated from a parent record to a child stream
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: HashMap<String, Value>,
}

impl Context {
    /// Create an empty context (used for root streams)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, consuming and returning the context
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Add a string value
    #[must_use]
    pub fn with_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), Value::String(value.into()));
        self
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a value rendered as a string (strings verbatim, numbers formatted)
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Whether the context holds no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

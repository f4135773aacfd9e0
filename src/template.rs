//! Path template rendering
//!
//! Endpoint paths may contain `{placeholder}` segments that are filled from a
//! parent context, e.g. `surveys/{survey_id}/responses`. A placeholder with no
//! matching context key is a programming/configuration error, not a transient
//! failure, and renders as `Error::UndefinedVariable`.

use crate::context::Context;
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Regex for matching path placeholders: {variable}
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").unwrap());

/// Render a path template with the given context
pub fn render(template: &str, ctx: &Context) -> Result<String> {
    let mut result = template.to_string();
    let mut missing = Vec::new();

    for cap in PLACEHOLDER_REGEX.captures_iter(template) {
        let full_match = cap.get(0).unwrap().as_str();
        let key = cap.get(1).unwrap().as_str();

        match ctx.get_string(key) {
            Some(value) => {
                result = result.replace(full_match, &value);
            }
            None => missing.push(key.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(result)
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Check if a template contains placeholders
pub fn has_placeholders(template: &str) -> bool {
    PLACEHOLDER_REGEX.is_match(template)
}

/// Extract all placeholder names from a template
pub fn placeholders(template: &str) -> Vec<String> {
    PLACEHOLDER_REGEX
        .captures_iter(template)
        .map(|cap| cap.get(1).unwrap().as_str().to_string())
        .collect()
}

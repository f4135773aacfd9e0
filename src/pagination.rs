//! Pagination
//!
//! The API signals continuation through a next-page pointer in the response
//! body (`pagination_data.next_url`). The pointer is a full URL or URL
//! fragment; only its `start` query value is carried into the follow-up
//! request, together with a fixed `items_per_page`. A present, non-empty
//! pointer means more pages exist; an absent, null or empty pointer ends the
//! stream's pagination loop.

use crate::decode::extract_path;
use serde_json::Value;

/// `items_per_page` value sent alongside a salvaged cursor
pub const PAGE_SIZE: u32 = 20;

/// Extract the next-page token from a response body.
///
/// Returns `None` when the pointer is missing, null or empty — the signal to
/// stop paginating.
pub fn next_page_token(body: &Value, next_page_path: &str) -> Option<String> {
    match extract_path(body, next_page_path)? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Salvage the `start` value from a next-page token.
///
/// The token is a URL (or fragment) such as
/// `https://data-api.survicate.com/v2/surveys?start=abc123&items_per_page=20`;
/// the useful part is the substring following the last `start=` up to the
/// next `&` or the end of the string. A token without `start=` is used as-is
/// up to its first `&`.
pub fn start_from_token(token: &str) -> &str {
    let after = token
        .rsplit_once("start=")
        .map_or(token, |(_, after)| after);
    after.split('&').next().unwrap_or("")
}

//! Survicate stream definitions
//!
//! The API exposes three related resources: surveys, survey responses, and
//! respondent attributes. Each is a variant of the `SurvicateStream`
//! capability trait; the trait supplies the shared request-parameter and
//! pagination wiring, and variants override only the fields that differ
//! (endpoint path, primary key, schema, parent/child hooks).
//!
//! Parent→child relations are modeled as an explicit `StreamNode` tree that
//! the tap declares; the engine walks it, handing each parent record's
//! context to the children.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::pagination::{start_from_token, PAGE_SIZE};
use serde_json::{json, Value};

/// Default JSONPath to the record array in a response body
pub const RECORDS_PATH: &str = "$.data[*]";

/// Default JSONPath to the next-page pointer in a response body
pub const NEXT_PAGE_PATH: &str = "$.pagination_data.next_url";

/// Capability interface implemented by every Survicate stream
pub trait SurvicateStream: Send + Sync {
    /// Stream name, used for output messages and state
    fn name(&self) -> &'static str;

    /// Endpoint path, relative to the base URL; may contain `{placeholder}`
    /// segments filled from the parent context
    fn path(&self) -> &'static str;

    /// Primary key field(s) of emitted records
    fn primary_key(&self) -> &'static [&'static str];

    /// Fixed JSON schema for emitted records
    fn schema(&self) -> Value;

    /// JSONPath locating the record array in a response body
    fn records_path(&self) -> &'static str {
        RECORDS_PATH
    }

    /// JSONPath locating the next-page pointer in a response body
    fn next_page_path(&self) -> &'static str {
        NEXT_PAGE_PATH
    }

    /// Field used to order records incrementally, if any
    fn replication_key(&self) -> Option<&'static str> {
        None
    }

    /// Query parameters for the next request.
    ///
    /// With a next-page token, the `start` value is salvaged from the token
    /// and a fixed `items_per_page` is sent. The first request of a sync
    /// carries no `start` parameter; the server returns the first page.
    /// Streams with a replication key always order ascending by that key.
    fn url_params(&self, next_page_token: Option<&str>) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = Vec::new();

        if let Some(token) = next_page_token {
            params.push(("start".to_string(), start_from_token(token).to_string()));
            params.push(("items_per_page".to_string(), PAGE_SIZE.to_string()));
        }

        if let Some(key) = self.replication_key() {
            params.push(("sort".to_string(), "asc".to_string()));
            params.push(("order_by".to_string(), key.to_string()));
        }

        params
    }

    /// Post-process a parsed row before emission (e.g. stamp the parent's
    /// foreign key onto it)
    fn post_process(&self, row: Value, _ctx: &Context) -> Result<Value> {
        Ok(row)
    }

    /// Context handed to child streams for one emitted record.
    ///
    /// Returns `None` for leaf streams. A record missing the identifier a
    /// child needs is a fatal error, not a transient failure.
    fn child_context(&self, _record: &Value, _ctx: &Context) -> Result<Option<Context>> {
        Ok(None)
    }
}

/// A node in the stream dependency tree declared by the tap
pub struct StreamNode {
    /// The stream definition at this node
    pub stream: Box<dyn SurvicateStream>,
    /// Child streams driven once per record of this stream
    pub children: Vec<StreamNode>,
}

impl StreamNode {
    /// Create a leaf node
    pub fn new(stream: Box<dyn SurvicateStream>) -> Self {
        Self {
            stream,
            children: Vec::new(),
        }
    }

    /// Attach a child node
    #[must_use]
    pub fn with_child(mut self, child: StreamNode) -> Self {
        self.children.push(child);
        self
    }

    /// Names of this node's stream and all descendants, depth-first
    pub fn stream_names(&self) -> Vec<&'static str> {
        let mut names = vec![self.stream.name()];
        for child in &self.children {
            names.extend(child.stream_names());
        }
        names
    }
}

/// Read a scalar field from a record as a string
fn record_string_field(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// Surveys
// ============================================================================

/// Root stream: all surveys in the account
pub struct SurveysStream;

impl SurvicateStream for SurveysStream {
    fn name(&self) -> &'static str {
        "surveys"
    }

    fn path(&self) -> &'static str {
        "surveys"
    }

    fn primary_key(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "name": { "type": ["string", "null"] },
                "type": { "type": ["string", "null"] },
                "created_at": { "type": ["string", "null"], "format": "date-time" },
                "updated_at": { "type": ["string", "null"], "format": "date-time" }
            },
            "additionalProperties": true
        })
    }

    fn child_context(&self, record: &Value, _ctx: &Context) -> Result<Option<Context>> {
        let survey_id = record_string_field(record, "id")
            .ok_or_else(|| Error::missing_context_key(self.name(), "id"))?;
        Ok(Some(Context::new().with_string("survey_id", survey_id)))
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Child of surveys: all responses submitted to one survey
pub struct ResponsesStream;

impl SurvicateStream for ResponsesStream {
    fn name(&self) -> &'static str {
        "responses"
    }

    fn path(&self) -> &'static str {
        "surveys/{survey_id}/responses"
    }

    fn primary_key(&self) -> &'static [&'static str] {
        &["uuid"]
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "uuid": { "type": "string" },
                "survey_id": { "type": "string" },
                "respondent": {
                    "type": ["object", "null"],
                    "properties": {
                        "uuid": { "type": "string" }
                    },
                    "additionalProperties": true
                },
                "answers": { "type": ["array", "null"] },
                "submitted_at": { "type": ["string", "null"], "format": "date-time" }
            },
            "additionalProperties": true
        })
    }

    fn post_process(&self, mut row: Value, ctx: &Context) -> Result<Value> {
        let survey_id = ctx
            .get("survey_id")
            .cloned()
            .ok_or_else(|| Error::missing_context_key(self.name(), "survey_id"))?;
        if let Some(obj) = row.as_object_mut() {
            obj.insert("survey_id".to_string(), survey_id);
        }
        Ok(row)
    }

    fn child_context(&self, record: &Value, _ctx: &Context) -> Result<Option<Context>> {
        let respondent_uuid = record
            .get("respondent")
            .and_then(|r| record_string_field(r, "uuid"))
            .ok_or_else(|| Error::missing_context_key(self.name(), "respondent.uuid"))?;
        Ok(Some(
            Context::new().with_string("respondent_uuid", respondent_uuid),
        ))
    }
}

// ============================================================================
// Respondents
// ============================================================================

/// Child of responses: attributes of one respondent.
///
/// Defined but not part of the default active set; the tap wires it in only
/// when the respondents flag is enabled.
pub struct RespondentsStream;

impl SurvicateStream for RespondentsStream {
    fn name(&self) -> &'static str {
        "respondents"
    }

    fn path(&self) -> &'static str {
        "respondents/{respondent_uuid}/attributes"
    }

    fn primary_key(&self) -> &'static [&'static str] {
        &["respondent_uuid", "name"]
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "respondent_uuid": { "type": "string" },
                "name": { "type": ["string", "null"] },
                "value": { "type": ["string", "null"] }
            },
            "additionalProperties": true
        })
    }

    fn post_process(&self, mut row: Value, ctx: &Context) -> Result<Value> {
        let respondent_uuid = ctx
            .get("respondent_uuid")
            .cloned()
            .ok_or_else(|| Error::missing_context_key(self.name(), "respondent_uuid"))?;
        if let Some(obj) = row.as_object_mut() {
            obj.insert("respondent_uuid".to_string(), respondent_uuid);
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Test-only stream with a replication key, to exercise the incremental
    /// branch of the shared parameter algorithm
    struct OrderedStream;

    impl SurvicateStream for OrderedStream {
        fn name(&self) -> &'static str {
            "ordered"
        }

        fn path(&self) -> &'static str {
            "ordered"
        }

        fn primary_key(&self) -> &'static [&'static str] {
            &["id"]
        }

        fn schema(&self) -> Value {
            json!({ "type": "object", "additionalProperties": true })
        }

        fn replication_key(&self) -> Option<&'static str> {
            Some("updated_at")
        }
    }

    fn params_map(params: Vec<(String, String)>) -> std::collections::HashMap<String, String> {
        params.into_iter().collect()
    }

    #[test]
    fn test_first_request_sends_no_params() {
        let params = SurveysStream.url_params(None);
        assert!(params.is_empty());
    }

    #[test]
    fn test_token_salvages_start_and_sets_page_size() {
        let params = params_map(SurveysStream.url_params(Some(
            "https://data-api.survicate.com/v2/surveys?start=abc123&items_per_page=20",
        )));
        assert_eq!(params.get("start").map(String::as_str), Some("abc123"));
        assert_eq!(params.get("items_per_page").map(String::as_str), Some("20"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_streams_without_replication_key_never_send_ordering() {
        for params in [
            SurveysStream.url_params(Some("?start=x")),
            ResponsesStream.url_params(Some("?start=x")),
            RespondentsStream.url_params(None),
        ] {
            let params = params_map(params);
            assert!(!params.contains_key("sort"));
            assert!(!params.contains_key("order_by"));
        }
    }

    #[test]
    fn test_replication_key_always_sends_ordering() {
        // With and without a token
        for token in [None, Some("?start=abc")] {
            let params = params_map(OrderedStream.url_params(token));
            assert_eq!(params.get("sort").map(String::as_str), Some("asc"));
            assert_eq!(
                params.get("order_by").map(String::as_str),
                Some("updated_at")
            );
        }
    }

    #[test]
    fn test_surveys_child_context() {
        let record = json!({ "id": "s1", "name": "NPS" });
        let ctx = SurveysStream
            .child_context(&record, &Context::new())
            .unwrap()
            .unwrap();
        assert_eq!(ctx.get_string("survey_id"), Some("s1".to_string()));
    }

    #[test]
    fn test_surveys_child_context_numeric_id() {
        let record = json!({ "id": 42 });
        let ctx = SurveysStream
            .child_context(&record, &Context::new())
            .unwrap()
            .unwrap();
        assert_eq!(ctx.get_string("survey_id"), Some("42".to_string()));
    }

    #[test]
    fn test_surveys_child_context_missing_id_is_fatal() {
        let record = json!({ "name": "no id here" });
        let err = SurveysStream
            .child_context(&record, &Context::new())
            .unwrap_err();
        assert!(matches!(err, Error::MissingContextKey { .. }));
    }

    #[test]
    fn test_responses_post_process_stamps_survey_id() {
        let ctx = Context::new().with_string("survey_id", "s1");
        let row = ResponsesStream
            .post_process(json!({ "uuid": "r1" }), &ctx)
            .unwrap();
        assert_eq!(row, json!({ "uuid": "r1", "survey_id": "s1" }));
    }

    #[test]
    fn test_responses_post_process_without_context_is_fatal() {
        let err = ResponsesStream
            .post_process(json!({ "uuid": "r1" }), &Context::new())
            .unwrap_err();
        assert!(matches!(err, Error::MissingContextKey { .. }));
    }

    #[test]
    fn test_responses_child_context_reads_respondent_uuid() {
        let record = json!({ "uuid": "r1", "respondent": { "uuid": "u-9" } });
        let ctx = ResponsesStream
            .child_context(&record, &Context::new())
            .unwrap()
            .unwrap();
        assert_eq!(ctx.get_string("respondent_uuid"), Some("u-9".to_string()));
    }

    #[test]
    fn test_responses_child_context_missing_respondent_is_fatal() {
        let record = json!({ "uuid": "r1" });
        let err = ResponsesStream
            .child_context(&record, &Context::new())
            .unwrap_err();
        assert!(matches!(err, Error::MissingContextKey { .. }));
    }

    #[test]
    fn test_respondents_post_process_stamps_uuid() {
        let ctx = Context::new().with_string("respondent_uuid", "u-9");
        let row = RespondentsStream
            .post_process(json!({ "name": "plan", "value": "pro" }), &ctx)
            .unwrap();
        assert_eq!(
            row,
            json!({ "name": "plan", "value": "pro", "respondent_uuid": "u-9" })
        );
    }

    #[test]
    fn test_stream_node_names() {
        let tree = StreamNode::new(Box::new(SurveysStream))
            .with_child(StreamNode::new(Box::new(ResponsesStream)));
        assert_eq!(tree.stream_names(), vec!["surveys", "responses"]);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(SurveysStream.records_path(), "$.data[*]");
        assert_eq!(SurveysStream.next_page_path(), "$.pagination_data.next_url");
        assert_eq!(SurveysStream.replication_key(), None);
        assert_eq!(ResponsesStream.path(), "surveys/{survey_id}/responses");
        assert_eq!(
            RespondentsStream.path(),
            "respondents/{respondent_uuid}/attributes"
        );
    }
}

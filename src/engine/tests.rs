//! Tests for the sync engine

use super::*;
use crate::http::HttpClientConfig;
use crate::streams::{SurveysStream, SurvicateStream};
use crate::tap::Tap;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine_for(server: &MockServer) -> SyncEngine {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .backoff(Duration::from_millis(1), Duration::from_millis(5))
        .build();
    SyncEngine::new(HttpClient::with_config(config), StateManager::in_memory())
}

fn records_of(messages: &[Message], stream: &str) -> Vec<Value> {
    messages
        .iter()
        .filter_map(|m| match m {
            Message::Record {
                stream: s, record, ..
            } if s == stream => Some(record.clone()),
            _ => None,
        })
        .collect()
}

fn schema_count(messages: &[Message], stream: &str) -> usize {
    messages
        .iter()
        .filter(|m| matches!(m, Message::Schema { stream: s, .. } if s == stream))
        .count()
}

#[tokio::test]
async fn test_two_page_pagination_salvages_start_and_unions_rows() {
    let server = MockServer::start().await;

    // Second page: matched only when the salvaged cursor is sent back
    Mock::given(method("GET"))
        .and(path("/surveys"))
        .and(query_param("start", "tok2"))
        .and(query_param("items_per_page", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "s2" }],
            "pagination_data": { "next_url": null }
        })))
        .expect(1)
        .mount(&server)
        .await;

    // First page: no query parameters on the first request of a sync
    Mock::given(method("GET"))
        .and(path("/surveys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "s1" }],
            "pagination_data": {
                "next_url": "https://data-api.survicate.com/v2/surveys?start=tok2&items_per_page=20"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = engine_for(&server);
    let (messages, records) = engine
        .sync_stream(&SurveysStream, &Context::new())
        .await
        .unwrap();

    assert_eq!(records, vec![json!({ "id": "s1" }), json!({ "id": "s2" })]);
    assert_eq!(records_of(&messages, "surveys").len(), 2);
    assert_eq!(engine.stats().pages_fetched, 2);
    assert_eq!(engine.stats().records_synced, 2);
}

#[tokio::test]
async fn test_pagination_terminates_on_absent_pointer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/surveys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "s1" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = engine_for(&server);
    let (_, records) = engine
        .sync_stream(&SurveysStream, &Context::new())
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(engine.stats().pages_fetched, 1);
}

#[tokio::test]
async fn test_parent_child_context_threading() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/surveys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "s1" }],
            "pagination_data": { "next_url": null }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/surveys/s1/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "uuid": "r1", "respondent": { "uuid": "u-1" } },
                { "uuid": "r2", "respondent": { "uuid": "u-2" } }
            ],
            "pagination_data": { "next_url": null }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tree = Tap::stream_tree(false);
    let mut engine = engine_for(&server);
    let messages = engine
        .sync_node(&tree[0], Context::new())
        .await
        .unwrap();

    let responses = records_of(&messages, "responses");
    assert_eq!(responses.len(), 2);
    for row in &responses {
        assert_eq!(row["survey_id"], json!("s1"));
    }
}

#[tokio::test]
async fn test_grandchild_respondents_chain() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/surveys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "s1" }],
            "pagination_data": { "next_url": null }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/surveys/s1/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "uuid": "r1", "respondent": { "uuid": "u-9" } }],
            "pagination_data": { "next_url": null }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/respondents/u-9/attributes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "name": "plan", "value": "pro" }],
            "pagination_data": { "next_url": null }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tree = Tap::stream_tree(true);
    let mut engine = engine_for(&server);
    let messages = engine
        .sync_node(&tree[0], Context::new())
        .await
        .unwrap();

    let respondents = records_of(&messages, "respondents");
    assert_eq!(respondents.len(), 1);
    assert_eq!(respondents[0]["respondent_uuid"], json!("u-9"));
}

#[tokio::test]
async fn test_malformed_body_yields_empty_final_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/surveys"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = engine_for(&server);
    let (messages, records) = engine
        .sync_stream(&SurveysStream, &Context::new())
        .await
        .unwrap();

    assert!(records.is_empty());
    assert!(messages
        .iter()
        .any(|m| matches!(m, Message::Log { level: LogLevel::Warn, .. })));
}

#[tokio::test]
async fn test_missing_parent_id_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/surveys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "name": "survey without id" }],
            "pagination_data": { "next_url": null }
        })))
        .mount(&server)
        .await;

    let tree = Tap::stream_tree(false);
    let mut engine = engine_for(&server);
    let err = engine
        .sync_node(&tree[0], Context::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingContextKey { .. }));
}

#[tokio::test]
async fn test_schema_emitted_once_per_stream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/surveys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "s1" },
                { "id": "s2" }
            ],
            "pagination_data": { "next_url": null }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/surveys/s[12]/responses$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "uuid": "r1", "respondent": { "uuid": "u-1" } }],
            "pagination_data": { "next_url": null }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let tree = Tap::stream_tree(false);
    let mut engine = engine_for(&server);
    let messages = engine
        .sync_node(&tree[0], Context::new())
        .await
        .unwrap();

    // Responses synced once per survey, but its schema goes out only once
    assert_eq!(records_of(&messages, "responses").len(), 2);
    assert_eq!(schema_count(&messages, "responses"), 1);
    assert_eq!(schema_count(&messages, "surveys"), 1);
}

#[tokio::test]
async fn test_max_records_truncates_stream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/surveys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "s1" }, { "id": "s2" }, { "id": "s3" }],
            "pagination_data": {
                "next_url": "https://data-api.survicate.com/v2/surveys?start=more"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = engine_for(&server).with_config(SyncConfig::new().with_max_records(2));
    let (_, records) = engine
        .sync_stream(&SurveysStream, &Context::new())
        .await
        .unwrap();

    // Truncated to the limit and pagination stopped despite a live pointer
    assert_eq!(records.len(), 2);
    assert_eq!(engine.stats().pages_fetched, 1);
}

#[tokio::test]
async fn test_replication_key_orders_and_tracks_cursor() {
    /// Test-only incremental stream
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

    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ordered"))
        .and(query_param("sort", "asc"))
        .and(query_param("order_by", "updated_at"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "a", "updated_at": "2024-01-01T00:00:00Z" },
                { "id": "b", "updated_at": "2024-03-01T00:00:00Z" }
            ],
            "pagination_data": { "next_url": null }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = engine_for(&server);
    let (messages, _) = engine
        .sync_stream(&OrderedStream, &Context::new())
        .await
        .unwrap();

    assert_eq!(
        engine.state().get_cursor("ordered").await,
        Some("2024-03-01T00:00:00Z".to_string())
    );
    assert!(messages
        .iter()
        .any(|m| matches!(m, Message::State { stream, .. } if stream == "ordered")));
}

#[test]
fn test_max_cursor_value_nested_field() {
    let records = vec![
        json!({ "meta": { "seq": 3 } }),
        json!({ "meta": { "seq": 9 } }),
        json!({ "meta": {} }),
    ];
    assert_eq!(
        max_cursor_value(&records, "meta.seq"),
        Some("9".to_string())
    );
}

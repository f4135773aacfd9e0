//! Execution engine
//!
//! Drives a stream node to exhaustion: render the endpoint path from the
//! parent context, paginate until the next-page pointer runs dry, post-process
//! and emit every record, and only then hand each record's child context to
//! the declared child streams. Strictly sequential: one request in flight at
//! a time, a stream fully paginated before its children start.

mod types;

pub use types::{LogLevel, Message, SyncConfig, SyncStats};

use crate::context::Context;
use crate::decode::JsonDecoder;
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::pagination::next_page_token;
use crate::state::StateManager;
use crate::streams::{StreamNode, SurvicateStream};
use crate::template;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tracing::{debug, warn};

/// Sync engine for orchestrating data extraction
pub struct SyncEngine {
    /// HTTP client
    client: HttpClient,
    /// State manager
    state: StateManager,
    /// Sync configuration
    config: SyncConfig,
    /// Statistics
    stats: SyncStats,
    /// Streams whose schema has already been emitted this run
    schemas_emitted: HashSet<String>,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(client: HttpClient, state: StateManager) -> Self {
        Self {
            client,
            state,
            config: SyncConfig::default(),
            stats: SyncStats::default(),
            schemas_emitted: HashSet::new(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Drive a stream node and its declared children to exhaustion.
    ///
    /// The node's stream is fully paginated first; afterwards every collected
    /// record yields one child context, and each child node runs once per
    /// context. Boxed because the tree is walked recursively.
    pub fn sync_node<'a>(
        &'a mut self,
        node: &'a StreamNode,
        ctx: Context,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Message>>> + Send + 'a>> {
        Box::pin(async move {
            let (mut messages, records) = self.sync_stream(node.stream.as_ref(), &ctx).await?;

            if !node.children.is_empty() {
                for record in &records {
                    let Some(child_ctx) = node.stream.child_context(record, &ctx)? else {
                        continue;
                    };
                    for child in &node.children {
                        let child_messages = self.sync_node(child, child_ctx.clone()).await?;
                        messages.extend(child_messages);
                    }
                }
            }

            Ok(messages)
        })
    }

    /// Sync a single stream with the given context
    pub async fn sync_stream(
        &mut self,
        stream: &dyn SurvicateStream,
        ctx: &Context,
    ) -> Result<(Vec<Message>, Vec<Value>)> {
        let start = Instant::now();
        let name = stream.name();
        let mut messages = Vec::new();

        if self.schemas_emitted.insert(name.to_string()) {
            messages.push(Message::schema(name, stream.schema(), stream.primary_key()));
        }

        messages.push(Message::info(format!("Starting sync for stream: {name}")));

        // Missing context keys surface here, before any request is made
        let path = template::render(stream.path(), ctx)?;
        let decoder = JsonDecoder::with_path(stream.records_path());

        let mut records: Vec<Value> = Vec::new();
        let mut next_token: Option<String> = None;
        let mut page_count = 0u32;

        loop {
            let mut request = RequestConfig::new();
            for (key, value) in stream.url_params(next_token.as_deref()) {
                request = request.query(key, value);
            }

            let response = self.client.get_with_config(&path, request).await?;
            let body = response.text().await.map_err(Error::Http)?;

            page_count += 1;
            self.stats.add_page();

            let body_json: Value = match serde_json::from_str(&body) {
                Ok(value) => value,
                Err(e) => {
                    // Malformed body: an empty final page, not an error
                    warn!(stream = name, "response body is not valid JSON: {e}");
                    messages.push(Message::warn(format!(
                        "Stream {name}: page {page_count} is not valid JSON, ending pagination"
                    )));
                    break;
                }
            };

            let page_records = decoder.extract_records(&body_json);
            debug!(
                stream = name,
                page = page_count,
                records = page_records.len(),
                "fetched page"
            );
            messages.push(Message::debug(format!(
                "Page {page_count}: fetched {} records",
                page_records.len()
            )));

            for row in page_records {
                records.push(stream.post_process(row, ctx)?);
            }

            if self.config.max_records > 0 && records.len() >= self.config.max_records {
                records.truncate(self.config.max_records);
                break;
            }

            next_token = next_page_token(&body_json, stream.next_page_path());
            if next_token.is_none() {
                break;
            }
        }

        if let Some(key) = stream.replication_key() {
            if let Some(max_cursor) = max_cursor_value(&records, key) {
                self.state.set_cursor(name, max_cursor.clone()).await;
                messages.push(Message::state(name, json!({ "cursor": max_cursor })));
            }
        }

        for record in &records {
            messages.push(Message::record(name, record.clone()));
        }

        self.stats.add_records(records.len());
        self.stats.add_stream();
        self.stats.set_duration(start.elapsed().as_millis() as u64);

        messages.push(Message::info(format!(
            "Completed sync for {name}: {} records in {page_count} pages",
            records.len()
        )));

        Ok((messages, records))
    }
}

/// The maximum value of a (possibly nested) field across records
fn max_cursor_value(records: &[Value], cursor_field: &str) -> Option<String> {
    records
        .iter()
        .filter_map(|record| {
            let mut current = record;
            for part in cursor_field.split('.') {
                current = current.get(part)?;
            }
            match current {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        })
        .max()
}

#[cfg(test)]
mod tests;

//! CLI runner - executes commands

use crate::auth::Authenticator;
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::TapConfig;
use crate::context::Context;
use crate::engine::{LogLevel, Message, SyncConfig, SyncEngine};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig};
use crate::state::StateManager;
use crate::tap::Tap;
use serde_json::{json, Value};
use std::time::Instant;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Spec => self.spec(),
            Commands::Check { config_json } => self.check(config_json.as_deref()).await,
            Commands::Discover { config_json } => self.discover(config_json.as_deref()),
            Commands::Read {
                streams,
                config_json,
                max_records,
            } => {
                self.read(streams.as_deref(), config_json.as_deref(), *max_records)
                    .await
            }
            Commands::Streams => self.streams(),
        }
    }

    /// Load configuration; a missing or invalid config fails here, before
    /// any HTTP request is made
    fn load_config(&self, inline: Option<&str>) -> Result<TapConfig> {
        if let Some(json_str) = inline {
            return TapConfig::from_json_str(json_str);
        }

        if let Some(path) = &self.cli.config {
            return TapConfig::from_file(path);
        }

        Err(Error::config(
            "No configuration provided (use --config or --config-json)",
        ))
    }

    /// Load state
    fn load_state(&self) -> Result<StateManager> {
        if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)
        } else {
            Ok(StateManager::in_memory())
        }
    }

    /// Build an authenticated HTTP client for the configured base URL
    fn build_client(config: &TapConfig) -> HttpClient {
        let http_config = HttpClientConfig::builder()
            .base_url(&config.api_url)
            .build();
        HttpClient::with_auth(http_config, Authenticator::from_config(config))
    }

    /// Show the connector spec
    fn spec(&self) -> Result<()> {
        self.output_message(&json!({
            "type": "SPEC",
            "spec": Tap::spec()
        }));
        Ok(())
    }

    /// Check connection
    async fn check(&self, config_json: Option<&str>) -> Result<()> {
        let config = self.load_config(config_json)?;
        let tap = Tap::new(config);
        let client = Self::build_client(tap.config());

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!("Checking connection to {}", tap.config().api_url)
            }
        }));

        let result = tap.check(&client).await;
        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": {
                "status": if result.success { "SUCCEEDED" } else { "FAILED" },
                "message": result.message.unwrap_or_else(|| "Connection successful".to_string())
            }
        }));

        Ok(())
    }

    /// Discover streams
    fn discover(&self, config_json: Option<&str>) -> Result<()> {
        let config = self.load_config(config_json)?;
        let tap = Tap::new(config);

        self.output_message(&json!({
            "type": "CATALOG",
            "catalog": tap.discover()
        }));

        Ok(())
    }

    /// List stream names
    fn streams(&self) -> Result<()> {
        let names: Vec<&str> = Tap::stream_tree(crate::tap::RESPONDENTS_ENABLED)
            .iter()
            .flat_map(crate::streams::StreamNode::stream_names)
            .collect();

        self.output_message(&json!({
            "type": "STREAMS",
            "streams": names,
            "connector": crate::tap::TAP_NAME
        }));

        Ok(())
    }

    /// Read data
    async fn read(
        &self,
        streams: Option<&str>,
        config_json: Option<&str>,
        max_records: Option<usize>,
    ) -> Result<()> {
        let sync_start = Instant::now();

        let config = self.load_config(config_json)?;
        let tap = Tap::new(config);
        let client = Self::build_client(tap.config());
        let state = self.load_state()?;

        let mut sync_config = SyncConfig::new();
        if let Some(max) = max_records {
            sync_config = sync_config.with_max_records(max);
        }

        let mut engine = SyncEngine::new(client, state).with_config(sync_config);

        let stream_filter: Option<Vec<&str>> =
            streams.map(|s| s.split(',').map(str::trim).collect());

        let mut stream_results: Vec<Value> = Vec::new();

        for node in tap.active_streams() {
            let root_name = node.stream.name();

            if let Some(ref filter) = stream_filter {
                if !filter.contains(&root_name) {
                    continue;
                }
            }

            let stream_start = Instant::now();
            let records_before = engine.stats().records_synced;

            let sync_result = engine.sync_node(&node, Context::new()).await;

            let stream_duration_ms = stream_start.elapsed().as_millis() as u64;
            let stream_records = engine.stats().records_synced - records_before;

            match sync_result {
                Ok(messages) => {
                    for message in &messages {
                        self.output_engine_message(message);
                    }
                    stream_results.push(json!({
                        "stream": root_name,
                        "status": "SUCCESS",
                        "records_synced": stream_records,
                        "duration_ms": stream_duration_ms
                    }));
                }
                Err(e) => {
                    self.output_message(&json!({
                        "type": "LOG",
                        "log": {
                            "level": "ERROR",
                            "message": format!("Error syncing stream {root_name}: {e}")
                        }
                    }));
                    stream_results.push(json!({
                        "stream": root_name,
                        "status": "FAILED",
                        "error": e.to_string(),
                        "records_synced": stream_records,
                        "duration_ms": stream_duration_ms
                    }));
                }
            }
        }

        // Persist and emit final state
        if let Some(state_path) = &self.cli.state {
            engine.state().save_to_file(state_path).await?;
        }

        let final_state = engine.state().to_json().await?;
        self.output_message(&json!({
            "type": "STATE",
            "state": serde_json::from_str::<Value>(&final_state).unwrap_or_default()
        }));

        let total_duration_ms = sync_start.elapsed().as_millis() as u64;
        let successful_streams = stream_results
            .iter()
            .filter(|r| r["status"] == "SUCCESS")
            .count();
        let failed_streams = stream_results.len() - successful_streams;

        self.output_message(&json!({
            "type": "SYNC_SUMMARY",
            "summary": {
                "status": if failed_streams == 0 { "SUCCEEDED" } else if successful_streams == 0 { "FAILED" } else { "PARTIAL" },
                "connector": crate::tap::TAP_NAME,
                "total_records": engine.stats().records_synced,
                "total_pages": engine.stats().pages_fetched,
                "total_streams": stream_results.len(),
                "successful_streams": successful_streams,
                "failed_streams": failed_streams,
                "duration_ms": total_duration_ms,
                "streams": stream_results
            }
        }));

        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }

    /// Output an engine message on the standard output channel
    fn output_engine_message(&self, msg: &Message) {
        match msg {
            Message::Schema {
                stream,
                schema,
                key_properties,
            } => {
                self.output_message(&json!({
                    "type": "SCHEMA",
                    "stream": stream,
                    "schema": schema,
                    "key_properties": key_properties
                }));
            }
            Message::Record { stream, record } => {
                self.output_message(&json!({
                    "type": "RECORD",
                    "record": {
                        "stream": stream,
                        "data": record,
                        "emitted_at": chrono::Utc::now().timestamp_millis()
                    }
                }));
            }
            Message::State { stream, data } => {
                self.output_message(&json!({
                    "type": "STATE",
                    "state": {
                        "type": "STREAM",
                        "stream": {
                            "stream_descriptor": { "name": stream },
                            "stream_state": data
                        }
                    }
                }));
            }
            Message::Log { level, message } => {
                let level_str = match level {
                    LogLevel::Debug => "DEBUG",
                    LogLevel::Info => "INFO",
                    LogLevel::Warn => "WARN",
                    LogLevel::Error => "ERROR",
                };
                self.output_message(&json!({
                    "type": "LOG",
                    "log": {
                        "level": level_str,
                        "message": message
                    }
                }));
            }
        }
    }
}

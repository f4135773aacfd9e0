//! The tap orchestrator
//!
//! Declares the configuration spec and the stream dependency tree, and
//! provides the connection-check and catalog operations. The engine does the
//! actual record extraction; this module only decides *what* runs.

use crate::config::{config_spec, ConfigProperty, TapConfig};
use crate::http::HttpClient;
use crate::streams::{
    RespondentsStream, ResponsesStream, StreamNode, SurveysStream, SurvicateStream,
};
use serde::Serialize;
use serde_json::Value;

/// Whether the respondents stream is wired into the active set.
///
/// The stream is fully implemented and tested but the per-respondent
/// attributes endpoint is not enabled for all accounts, so it ships disabled.
pub const RESPONDENTS_ENABLED: bool = false;

/// Connector name
pub const TAP_NAME: &str = "tap-survicate";

/// The Survicate tap
pub struct Tap {
    config: TapConfig,
}

impl Tap {
    /// Create a tap from a validated configuration
    pub fn new(config: TapConfig) -> Self {
        Self { config }
    }

    /// The tap configuration
    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    /// Connector specification (name + configuration properties)
    pub fn spec() -> TapSpec {
        TapSpec {
            name: TAP_NAME,
            description: "Extracts surveys, responses and respondent attributes \
                          from the Survicate data API",
            properties: config_spec(),
        }
    }

    /// The stream dependency tree.
    ///
    /// Surveys is the root; responses runs once per survey. With
    /// `include_respondents`, respondent attributes run once per response.
    pub fn stream_tree(include_respondents: bool) -> Vec<StreamNode> {
        let mut responses = StreamNode::new(Box::new(ResponsesStream));
        if include_respondents {
            responses = responses.with_child(StreamNode::new(Box::new(RespondentsStream)));
        }

        vec![StreamNode::new(Box::new(SurveysStream)).with_child(responses)]
    }

    /// The active stream tree for this run
    pub fn active_streams(&self) -> Vec<StreamNode> {
        Self::stream_tree(RESPONDENTS_ENABLED)
    }

    /// Names of all active streams, parents before children
    pub fn stream_names(&self) -> Vec<&'static str> {
        self.active_streams()
            .iter()
            .flat_map(StreamNode::stream_names)
            .collect()
    }

    /// Discover the catalog of active streams
    pub fn discover(&self) -> Catalog {
        fn collect(node: &StreamNode, streams: &mut Vec<CatalogStream>) {
            streams.push(CatalogStream::from_stream(node.stream.as_ref()));
            for child in &node.children {
                collect(child, streams);
            }
        }

        let mut streams = Vec::new();
        for node in self.active_streams() {
            collect(&node, &mut streams);
        }
        Catalog { streams }
    }

    /// Probe the API with the root endpoint to validate credentials
    pub async fn check(&self, client: &HttpClient) -> CheckResult {
        let root = SurveysStream;
        match client.get(root.path()).await {
            Ok(_) => CheckResult::success(),
            Err(e) => CheckResult::failure(format!("Connection failed: {e}")),
        }
    }
}

/// Connector specification returned by the `spec` command
#[derive(Debug, Clone, Serialize)]
pub struct TapSpec {
    /// Connector name
    pub name: &'static str,
    /// Description
    pub description: &'static str,
    /// Configuration properties
    pub properties: Vec<ConfigProperty>,
}

/// Result of a connection check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Whether the check succeeded
    pub success: bool,
    /// Error message if failed
    pub message: Option<String>,
}

impl CheckResult {
    /// Create a successful check result
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Create a failed check result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Discovered catalog of streams
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    /// Streams available in this run
    pub streams: Vec<CatalogStream>,
}

/// One stream in the catalog
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStream {
    /// Stream name
    pub name: String,
    /// JSON schema for emitted records
    pub json_schema: Value,
    /// Supported sync modes
    pub supported_sync_modes: Vec<SyncMode>,
    /// Replication key, when the stream orders incrementally
    pub default_cursor_field: Option<Vec<String>>,
    /// Source-defined primary key
    pub source_defined_primary_key: Vec<Vec<String>>,
}

impl CatalogStream {
    fn from_stream(stream: &dyn SurvicateStream) -> Self {
        let supported_sync_modes = if stream.replication_key().is_some() {
            vec![SyncMode::FullRefresh, SyncMode::Incremental]
        } else {
            vec![SyncMode::FullRefresh]
        };

        Self {
            name: stream.name().to_string(),
            json_schema: stream.schema(),
            supported_sync_modes,
            default_cursor_field: stream
                .replication_key()
                .map(|k| vec![k.to_string()]),
            source_defined_primary_key: stream
                .primary_key()
                .iter()
                .map(|k| vec![(*k).to_string()])
                .collect(),
        }
    }
}

/// Synchronization mode for a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Full refresh - fetch all data every time
    FullRefresh,
    /// Incremental - only fetch new/updated data
    Incremental,
}

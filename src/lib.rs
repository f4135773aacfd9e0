//! # tap-survicate
//!
//! A Rust-native data extraction connector ("tap") for the Survicate survey
//! API. It authenticates with a static token, issues paginated HTTP GET
//! requests against three related REST resources, and emits one structured
//! JSON message per record on stdout for downstream ingestion.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           Tap                               │
//! │  spec() → TapSpec    check() → CheckResult                  │
//! │  discover() → Catalog    stream_tree() → [StreamNode]       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────┬──────────┬─────┴─────┬────────────┬─────────────┐
//! │   Auth   │   HTTP   │ Paginate  │  Streams   │   Engine    │
//! ├──────────┼──────────┼───────────┼────────────┼─────────────┤
//! │ Static   │ GET      │ Next-URL  │ Surveys    │ Page loop   │
//! │ token    │ Retry    │ cursor    │ Responses  │ Context     │
//! │          │ Backoff  │ salvage   │ Respondents│ propagation │
//! └──────────┴──────────┴───────────┴────────────┴─────────────┘
//! ```
//!
//! The stream set is a closed group of variants behind the
//! [`streams::SurvicateStream`] trait; the [`tap::Tap`] orchestrator declares
//! which variants are active and how parents feed children, and the
//! [`engine::SyncEngine`] drives each stream to exhaustion, one request in
//! flight at a time.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the tap
pub mod error;

/// Tap configuration
pub mod config;

/// Authentication
pub mod auth;

/// HTTP client with retry support
pub mod http;

/// Parent→child context propagation
pub mod context;

/// Path template rendering
pub mod template;

/// JSON record extraction
pub mod decode;

/// Pagination cursor handling
pub mod pagination;

/// Survicate stream definitions
pub mod streams;

/// The tap orchestrator
pub mod tap;

/// Sync state persistence
pub mod state;

/// Main execution engine
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::TapConfig;
pub use error::{Error, Result};
pub use tap::Tap;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

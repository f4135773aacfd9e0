//! HTTP client with retry support
//!
//! One request is in flight at a time; resilience against transient failures
//! comes from bounded retries with exponential backoff.

mod client;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};

//! Authentication
//!
//! The Survicate data API uses a single static credential: every request
//! carries `Authorization: Basic <token>`, where the token is used exactly as
//! configured. There is no refresh or expiry handling.

use crate::config::TapConfig;
use reqwest::RequestBuilder;

/// Applies the static API credential to outgoing requests
#[derive(Clone)]
pub struct Authenticator {
    auth_token: String,
}

impl Authenticator {
    /// Create an authenticator from a raw token
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
        }
    }

    /// Create an authenticator from the tap configuration
    pub fn from_config(config: &TapConfig) -> Self {
        Self::new(config.auth_token.clone())
    }

    /// Apply the credential to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("Authorization", format!("Basic {}", self.auth_token))
    }

    /// The header value this authenticator produces
    pub fn header_value(&self) -> String {
        format!("Basic {}", self.auth_token)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the token itself
        f.debug_struct("Authenticator").finish_non_exhaustive()
    }
}

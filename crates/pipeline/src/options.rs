//! Per-repository adapter configuration.

use serde::{Deserialize, Serialize};

/// Settings the orchestrator passes to a backend for one repository.
///
/// Credentials are read once by `set_client` and not consulted afterwards.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterOptions {
    /// Display name of the CI application; also the commit status key.
    pub application_name: String,

    /// Base API URL. Used as the fallback details link for statuses and, when
    /// non-empty, as the endpoint the client talks to.
    #[serde(default)]
    pub api_url: String,

    /// API user name.
    #[serde(default)]
    pub username: String,

    /// API token or app password.
    #[serde(default)]
    pub token: String,
}

impl AdapterOptions {
    /// Creates options with no credentials.
    pub fn new(application_name: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            api_url: api_url.into(),
            username: String::new(),
            token: String::new(),
        }
    }

    /// Sets the credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, token: impl Into<String>) -> Self {
        self.username = username.into();
        self.token = token.into();
        self
    }
}

// The token must never reach logs.
impl std::fmt::Debug for AdapterOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterOptions")
            .field("application_name", &self.application_name)
            .field("api_url", &self.api_url)
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_token() {
        let opts = AdapterOptions::new("CI", "").with_credentials("bot", "s3cret");
        let rendered = format!("{opts:?}");
        assert!(rendered.contains("bot"));
        assert!(!rendered.contains("s3cret"));
    }
}
